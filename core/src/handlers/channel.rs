//! JOIN, PART, KICK, TOPIC, NAMES, LIST and INVITE

use crate::modes::Rank;
use crate::utils::string::{fold, matches_mask, truncate};
use crate::{Channel, ClientId, Message, MessageType, NumericReply, Result, Server, User};

pub fn handle_join(server: &Server, id: ClientId, message: &Message) -> Result<()> {
    let targets = &message.params[0];
    if targets == "0" {
        part_all(server, id);
        return Ok(());
    }

    let keys: Vec<&str> = message
        .param(1)
        .map(|keys| keys.split(',').collect())
        .unwrap_or_default();

    for (index, name) in targets.split(',').enumerate() {
        if name.is_empty() {
            continue;
        }
        join_channel(server, id, name, keys.get(index).copied());
    }
    Ok(())
}

/// Why an existing channel refuses a joiner, checked in protocol order
fn admission_refusal(channel: &Channel, id: &ClientId, mask: &str, key: Option<&str>) -> Option<(NumericReply, &'static str)> {
    if channel.has_mode('i') && !channel.is_invited(id, mask) {
        return Some((NumericReply::ErrInviteOnlyChan, "Cannot join channel (+i)"));
    }
    if channel.is_banned(mask) {
        return Some((NumericReply::ErrBannedFromChan, "Cannot join channel (+b)"));
    }
    if let Some(ref expected) = channel.key {
        if key != Some(expected.as_str()) {
            return Some((NumericReply::ErrBadChannelKey, "Cannot join channel (+k)"));
        }
    }
    if channel.limit.is_some_and(|limit| channel.member_count() >= limit) {
        return Some((NumericReply::ErrChannelIsFull, "Cannot join channel (+l)"));
    }
    None
}

fn join_channel(server: &Server, id: ClientId, name: &str, key: Option<&str>) {
    let Some(user) = server.user(&id) else {
        return;
    };
    let nick = user.nick().to_string();

    if !server.names().is_valid_channel_name(name) {
        server.reply(&id, NumericReply::no_such_channel(&nick, name));
        return;
    }
    if user.channels.contains(&fold(name)) {
        return;
    }

    let config = server.config();
    let too_many = (
        NumericReply::ErrTooManyChannels,
        "You have joined too many channels",
    );
    if user.channels.len() >= config.limits.max_channels_per_client {
        server.numeric(&id, too_many.0, vec![name.to_string(), too_many.1.to_string()]);
        return;
    }

    let registry = server.registry();
    let joined = {
        let mut map = registry.channels_mut();
        let refusal = match map.get(&fold(name)) {
            Some(existing) => admission_refusal(&existing.lock(), &id, &user.mask(), key),
            None if map.len() >= config.limits.max_channels => Some(too_many),
            None => None,
        };

        match refusal {
            Some(refusal) => Err(refusal),
            None => {
                let (handle, created) =
                    registry.find_or_create_channel(&mut map, name, &config.channels.default_modes);
                let mut channel = handle.lock();
                if !channel.join(registry, id, user.prefix()) {
                    registry.remove_if_empty(&mut map, &channel);
                    return;
                }
                if created {
                    channel.grant(id, Rank::Operator);
                }
                drop(channel);
                Ok(handle)
            }
        }
    };

    match joined {
        Ok(handle) => {
            let Some(viewer) = server.user(&id) else {
                return;
            };
            let channel = handle.lock();
            send_topic(server, &id, &nick, &channel);
            send_names(server, &id, &viewer, &channel);
            server.reply(&id, NumericReply::end_of_names(&nick, &channel.name));
        }
        Err((numeric, text)) => {
            server.numeric(&id, numeric, vec![name.to_string(), text.to_string()]);
        }
    }
}

/// `JOIN 0`: leave every channel
fn part_all(server: &Server, id: ClientId) {
    let Some(user) = server.user(&id) else {
        return;
    };
    let names: Vec<String> = {
        let map = server.registry().channels();
        user.channels
            .iter()
            .filter_map(|key| map.get(key).map(|channel| channel.lock().name.clone()))
            .collect()
    };
    for name in names {
        part_channel(server, id, &name, "Leaving");
    }
}

pub fn handle_part(server: &Server, id: ClientId, message: &Message) -> Result<()> {
    let reason = message.param(1).unwrap_or("Leaving");
    for name in message.params[0].split(',').filter(|name| !name.is_empty()) {
        part_channel(server, id, name, reason);
    }
    Ok(())
}

fn part_channel(server: &Server, id: ClientId, name: &str, reason: &str) {
    let Some(user) = server.user(&id) else {
        return;
    };
    let nick = user.nick();
    let registry = server.registry();

    let mut map = registry.channels_mut();
    let Some(handle) = map.get(&fold(name)).cloned() else {
        drop(map);
        server.reply(&id, NumericReply::no_such_channel(nick, name));
        return;
    };

    let mut channel = handle.lock();
    if !channel.is_member(&id) {
        drop(channel);
        drop(map);
        server.reply(&id, NumericReply::not_on_channel(nick, name));
        return;
    }

    channel.part(registry, &id, user.prefix(), reason);
    registry.remove_if_empty(&mut map, &channel);
}

pub fn handle_kick(server: &Server, id: ClientId, message: &Message) -> Result<()> {
    let Some(user) = server.user(&id) else {
        return Ok(());
    };
    let nick = user.nick().to_string();
    let name = &message.params[0];
    let max_kick = server.config().limits.max_kick_length;
    let reason = truncate(message.param(2).unwrap_or(nick.as_str()), max_kick).to_string();
    let registry = server.registry();

    for target_nick in message.params[1].split(',').filter(|n| !n.is_empty()) {
        let mut map = registry.channels_mut();
        let Some(handle) = map.get(&fold(name)).cloned() else {
            drop(map);
            server.reply(&id, NumericReply::no_such_channel(&nick, name));
            return Ok(());
        };
        let mut channel = handle.lock();

        let refusal = if !channel.is_member(&id) {
            Some(NumericReply::not_on_channel(&nick, &channel.name))
        } else if !channel.has_rank_or_better(&id, Rank::Operator) {
            Some(NumericReply::chanop_privs_needed(&nick, &channel.name))
        } else {
            None
        };
        if let Some(refusal) = refusal {
            drop(channel);
            drop(map);
            server.reply(&id, refusal);
            return Ok(());
        }

        let Some(target) = registry.find_user(target_nick) else {
            drop(channel);
            drop(map);
            server.reply(&id, NumericReply::no_such_nick(&nick, target_nick));
            continue;
        };
        if !channel.is_member(&target) {
            let channel_name = channel.name.clone();
            drop(channel);
            drop(map);
            server.numeric(
                &id,
                NumericReply::ErrUserNotInChannel,
                vec![
                    target_nick.to_string(),
                    channel_name,
                    "They aren't on that channel".to_string(),
                ],
            );
            continue;
        }

        let canonical = registry
            .with_client(&target, |client| client.nick().to_string())
            .unwrap_or_else(|| target_nick.to_string());
        channel.kick(registry, &target, &canonical, user.prefix(), &reason);
        registry.remove_if_empty(&mut map, &channel);
    }
    Ok(())
}

pub fn handle_topic(server: &Server, id: ClientId, message: &Message) -> Result<()> {
    let Some(user) = server.user(&id) else {
        return Ok(());
    };
    let nick = user.nick();
    let name = &message.params[0];

    let Some(handle) = server.registry().find_channel(name) else {
        server.reply(&id, NumericReply::no_such_channel(nick, name));
        return Ok(());
    };
    let mut channel = handle.lock();
    let is_member = channel.is_member(&id);

    let Some(text) = message.param(1) else {
        if !is_member && channel.is_hidden() && !user.is_operator {
            server.reply(&id, NumericReply::not_on_channel(nick, &channel.name));
        } else {
            send_topic(server, &id, nick, &channel);
        }
        return Ok(());
    };

    if !is_member {
        server.reply(&id, NumericReply::not_on_channel(nick, &channel.name));
        return Ok(());
    }
    if channel.has_mode('t') && !channel.has_rank_or_better(&id, Rank::Operator) {
        server.reply(&id, NumericReply::chanop_privs_needed(nick, &channel.name));
        return Ok(());
    }

    let text = truncate(text, server.config().limits.max_topic_length).to_string();
    if text.is_empty() {
        channel.topic = None;
    } else {
        channel.set_topic(text.clone(), nick.to_string());
    }

    let change = Message::with_prefix(
        user.prefix(),
        MessageType::Topic,
        vec![channel.name.clone(), text],
    );
    channel.broadcast(server.registry(), &change, None);
    Ok(())
}

/// 332/333, or 331 when no topic is set
fn send_topic(server: &Server, id: &ClientId, nick: &str, channel: &Channel) {
    match channel.topic {
        Some(ref topic) => {
            server.numeric(
                id,
                NumericReply::RplTopic,
                vec![channel.name.clone(), topic.text.clone()],
            );
            server.numeric(
                id,
                NumericReply::RplTopicWhoTime,
                vec![
                    channel.name.clone(),
                    topic.author.clone(),
                    topic.set_at.timestamp().to_string(),
                ],
            );
        }
        None => server.reply(id, NumericReply::no_topic(nick, &channel.name)),
    }
}

/// 353 lines for the members `viewer` may see, without the closing 366
fn send_names(server: &Server, id: &ClientId, viewer: &User, channel: &Channel) {
    let is_member = channel.is_member(id);
    if !is_member && channel.is_hidden() && !viewer.is_operator {
        return;
    }

    let mut names = Vec::with_capacity(channel.member_count());
    for member in channel.members() {
        let Some(target) = server.user(member) else {
            continue;
        };
        if !is_member && !server.can_see_user(id, viewer, member, &target) {
            continue;
        }
        names.push(format!("{}{}", channel.prefix_for(member), target.nick()));
    }

    let visibility = if channel.has_mode('s') {
        "@"
    } else if channel.has_mode('p') {
        "*"
    } else {
        "="
    };

    for chunk in names.chunks(NAMES_PER_LINE) {
        server.numeric(
            id,
            NumericReply::RplNamReply,
            vec![visibility.to_string(), channel.name.clone(), chunk.join(" ")],
        );
    }
}

const NAMES_PER_LINE: usize = 20;

pub fn handle_names(server: &Server, id: ClientId, message: &Message) -> Result<()> {
    let Some(viewer) = server.user(&id) else {
        return Ok(());
    };
    let nick = viewer.nick();

    match message.param(0).filter(|p| !p.is_empty()) {
        Some(targets) => {
            for name in targets.split(',').filter(|n| !n.is_empty()) {
                if let Some(handle) = server.registry().find_channel(name) {
                    send_names(server, &id, &viewer, &handle.lock());
                }
                server.reply(&id, NumericReply::end_of_names(nick, name));
            }
        }
        None => {
            let handles: Vec<_> = server.registry().channels().values().cloned().collect();
            for handle in handles {
                send_names(server, &id, &viewer, &handle.lock());
            }
            server.reply(&id, NumericReply::end_of_names(nick, "*"));
        }
    }
    Ok(())
}

/// One LIST selector
#[derive(Debug, Clone, PartialEq, Eq)]
enum ListFilter {
    /// `<n`: fewer than n members
    Fewer(usize),
    /// `>n`: more than n members
    More(usize),
    /// `!mask`: names not matching
    Exclude(String),
    /// Plain name or glob
    Pattern(String),
}

impl ListFilter {
    fn parse(raw: &str) -> Self {
        if let Some(n) = raw.strip_prefix('<').and_then(|n| n.parse().ok()) {
            return ListFilter::Fewer(n);
        }
        if let Some(n) = raw.strip_prefix('>').and_then(|n| n.parse().ok()) {
            return ListFilter::More(n);
        }
        match raw.strip_prefix('!') {
            Some(mask) => ListFilter::Exclude(mask.to_string()),
            None => ListFilter::Pattern(raw.to_string()),
        }
    }

    fn accepts(&self, channel: &Channel) -> bool {
        match self {
            ListFilter::Fewer(n) => channel.member_count() < *n,
            ListFilter::More(n) => channel.member_count() > *n,
            ListFilter::Exclude(mask) => !matches_mask(mask, &channel.name),
            ListFilter::Pattern(mask) => matches_mask(mask, &channel.name),
        }
    }
}

pub fn handle_list(server: &Server, id: ClientId, message: &Message) -> Result<()> {
    let Some(viewer) = server.user(&id) else {
        return Ok(());
    };
    let filters: Vec<ListFilter> = message
        .param(0)
        .map(|raw| raw.split(',').filter(|f| !f.is_empty()).map(ListFilter::parse).collect())
        .unwrap_or_default();
    let (counts, patterns): (Vec<_>, Vec<_>) = filters
        .iter()
        .partition(|f| !matches!(f, ListFilter::Pattern(_)));

    server.numeric(
        &id,
        NumericReply::RplListStart,
        vec!["Channel".to_string(), "Users  Name".to_string()],
    );

    let handles: Vec<_> = server.registry().channels().values().cloned().collect();
    for handle in handles {
        let channel = handle.lock();
        if channel.is_hidden() && !channel.is_member(&id) && !viewer.is_operator {
            continue;
        }
        if !counts.iter().all(|f| f.accepts(&channel)) {
            continue;
        }
        if !patterns.is_empty() && !patterns.iter().any(|f| f.accepts(&channel)) {
            continue;
        }

        let topic = channel.topic.as_ref().map(|t| t.text.as_str()).unwrap_or("");
        let modes = channel.mode_params(false).join(" ");
        server.numeric(
            &id,
            NumericReply::RplList,
            vec![
                channel.name.clone(),
                channel.member_count().to_string(),
                format!("[{}] {}", modes, topic),
            ],
        );
    }

    server.numeric(&id, NumericReply::RplListEnd, vec!["End of /LIST".to_string()]);
    Ok(())
}

pub fn handle_invite(server: &Server, id: ClientId, message: &Message) -> Result<()> {
    let Some(user) = server.user(&id) else {
        return Ok(());
    };
    let nick = user.nick();
    let target_nick = &message.params[0];
    let name = &message.params[1];
    let registry = server.registry();

    let Some(handle) = registry.find_channel(name) else {
        server.reply(&id, NumericReply::no_such_channel(nick, name));
        return Ok(());
    };
    let mut channel = handle.lock();

    if !channel.is_member(&id) {
        server.reply(&id, NumericReply::not_on_channel(nick, &channel.name));
        return Ok(());
    }
    if channel.has_mode('i') && !channel.has_rank_or_better(&id, Rank::Operator) {
        server.reply(&id, NumericReply::chanop_privs_needed(nick, &channel.name));
        return Ok(());
    }
    let Some(target) = registry.find_user(target_nick) else {
        server.reply(&id, NumericReply::no_such_nick(nick, target_nick));
        return Ok(());
    };
    let canonical = registry
        .with_client(&target, |client| client.nick().to_string())
        .unwrap_or_else(|| target_nick.to_string());
    if channel.is_member(&target) {
        server.numeric(
            &id,
            NumericReply::ErrUserOnChannel,
            vec![canonical, channel.name.clone(), "is already on channel".to_string()],
        );
        return Ok(());
    }

    channel.invite(target);
    server.numeric(
        &id,
        NumericReply::RplInviting,
        vec![canonical.clone(), channel.name.clone()],
    );
    registry.send(
        &target,
        Message::with_prefix(user.prefix(), MessageType::Invite, vec![canonical, channel.name.clone()]),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_filters() {
        let mut channel = Channel::new("#rust".to_string(), "");
        for _ in 0..3 {
            channel.add_member(uuid::Uuid::new_v4());
        }

        assert!(ListFilter::parse("<5").accepts(&channel));
        assert!(!ListFilter::parse(">3").accepts(&channel));
        assert!(ListFilter::parse(">2").accepts(&channel));
        assert!(ListFilter::parse("#r*").accepts(&channel));
        assert!(!ListFilter::parse("!#r*").accepts(&channel));
        assert_eq!(ListFilter::parse("<x"), ListFilter::Pattern("<x".to_string()));
    }

    #[test]
    fn test_admission_order() {
        let mut channel = Channel::new("#test".to_string(), "i");
        channel.key = Some("sekrit".to_string());
        channel.bans.push("*!*@bad.host".to_string());
        let id = uuid::Uuid::new_v4();
        let mask = "eve!e@bad.host";

        let refusal = admission_refusal(&channel, &id, mask, None).map(|r| r.0);
        assert_eq!(refusal, Some(NumericReply::ErrInviteOnlyChan));

        channel.invite(id);
        let refusal = admission_refusal(&channel, &id, mask, None).map(|r| r.0);
        assert_eq!(refusal, Some(NumericReply::ErrBannedFromChan));

        channel.excepts.push("eve!*@*".to_string());
        let refusal = admission_refusal(&channel, &id, mask, Some("wrong")).map(|r| r.0);
        assert_eq!(refusal, Some(NumericReply::ErrBadChannelKey));

        channel.limit = Some(1);
        channel.add_member(uuid::Uuid::new_v4());
        let refusal = admission_refusal(&channel, &id, mask, Some("sekrit")).map(|r| r.0);
        assert_eq!(refusal, Some(NumericReply::ErrChannelIsFull));

        channel.limit = None;
        assert!(admission_refusal(&channel, &id, mask, Some("sekrit")).is_none());
    }
}
