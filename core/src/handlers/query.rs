//! Directory queries, AWAY and MODE

use super::registration::{send_isupport, send_lusers, send_motd};
use crate::channel::ChannelModeTarget;
use crate::mode_change::{apply_mode_string, Rejection};
use crate::modes::{Rank, CHANNEL_MODES, USER_MODES};
use crate::registry::ChannelHandle;
use crate::utils::string::{matches_mask, truncate};
use crate::{Channel, ClientId, Message, MessageType, NumericReply, Result, Server, User};

pub fn handle_away(server: &Server, id: ClientId, message: &Message) -> Result<()> {
    let text = message
        .param(0)
        .filter(|text| !text.is_empty())
        .map(|text| truncate(text, server.config().limits.max_away_length).to_string());

    let (numeric, reply) = match text {
        Some(_) => (NumericReply::RplNowAway, "You have been marked as being away"),
        None => (NumericReply::RplUnAway, "You are no longer marked as being away"),
    };
    server
        .registry()
        .with_client_mut(&id, |client| client.user.set_away(text));
    server.numeric(&id, numeric, vec![reply.to_string()]);
    Ok(())
}

pub fn handle_whois(server: &Server, id: ClientId, message: &Message) -> Result<()> {
    let Some(viewer) = server.user(&id) else {
        return Ok(());
    };
    // WHOIS [server] nick
    let targets = message.param(1).unwrap_or(message.params[0].as_str());

    for target in targets.split(',').filter(|t| !t.is_empty()) {
        let found = server
            .registry()
            .find_user(target)
            .and_then(|target_id| server.user(&target_id).map(|user| (target_id, user)));
        match found {
            Some((target_id, user)) => send_whois(server, &id, &viewer, &target_id, &user),
            None => server.reply(&id, NumericReply::no_such_nick(viewer.nick(), target)),
        }
        server.numeric(
            &id,
            NumericReply::RplEndOfWhois,
            vec![target.to_string(), "End of /WHOIS list.".to_string()],
        );
    }
    Ok(())
}

fn send_whois(server: &Server, id: &ClientId, viewer: &User, target_id: &ClientId, target: &User) {
    let nick = target.nick().to_string();
    let privileged = id == target_id || viewer.is_operator;

    server.numeric(
        id,
        NumericReply::RplWhoisUser,
        vec![
            nick.clone(),
            target.username().to_string(),
            target.host.clone(),
            "*".to_string(),
            target.realname.clone(),
        ],
    );

    if privileged {
        server.numeric(
            id,
            NumericReply::RplWhoisHost,
            vec![nick.clone(), format!("is connecting from *@{}", target.host)],
        );
        server.numeric(
            id,
            NumericReply::RplWhoisModes,
            vec![nick.clone(), format!("is using modes {}", target.modes_string())],
        );
    }

    let channels: Vec<String> = {
        let map = server.registry().channels();
        target
            .channels
            .iter()
            .filter_map(|key| map.get(key))
            .filter_map(|handle| {
                let channel = handle.lock();
                let shares = channel.is_member(id);
                if target.has_mode('p') && !shares && id != target_id {
                    return None;
                }
                let visible = !channel.is_hidden() || shares || viewer.is_operator;
                visible.then(|| format!("{}{}", channel.prefix_for(target_id), channel.name))
            })
            .collect()
    };
    if !channels.is_empty() {
        server.numeric(id, NumericReply::RplWhoisChannels, vec![nick.clone(), channels.join(" ")]);
    }

    server.numeric(
        id,
        NumericReply::RplWhoisServer,
        vec![
            nick.clone(),
            server.name().to_string(),
            server.config().server.description.clone(),
        ],
    );
    if let Some(ref away) = target.away_message {
        server.numeric(id, NumericReply::RplAway, vec![nick.clone(), away.clone()]);
    }
    if target.operator_visible_to(viewer) {
        server.numeric(
            id,
            NumericReply::RplWhoisOperator,
            vec![nick.clone(), "is an IRC operator".to_string()],
        );
    }
    server.numeric(
        id,
        NumericReply::RplWhoisIdle,
        vec![
            nick,
            target.idle_seconds().to_string(),
            target.connected_at.timestamp().to_string(),
            "seconds idle, signon time".to_string(),
        ],
    );
}

pub fn handle_who(server: &Server, id: ClientId, message: &Message) -> Result<()> {
    let Some(viewer) = server.user(&id) else {
        return Ok(());
    };
    let mask = message
        .param(0)
        .filter(|m| !m.is_empty() && *m != "0")
        .unwrap_or("*");
    let operators_only = message.param(1) == Some("o");
    let registry = server.registry();

    if let Some(handle) = registry.find_channel(mask) {
        let channel = handle.lock();
        let is_member = channel.is_member(&id);
        if !channel.is_hidden() || is_member || viewer.is_operator {
            for member in channel.members() {
                let Some(user) = server.user(member) else {
                    continue;
                };
                if operators_only && !user.operator_visible_to(&viewer) {
                    continue;
                }
                if !is_member && !server.can_see_user(&id, &viewer, member, &user) {
                    continue;
                }
                send_who_line(server, &id, &viewer, &channel.name, &user, &channel.prefix_for(member));
            }
        }
    } else if !mask.starts_with('#') {
        for client_id in registry.client_ids() {
            let Some(user) = registry
                .with_client(&client_id, |client| client.is_registered().then(|| client.user.clone()))
                .flatten()
            else {
                continue;
            };
            if operators_only && !user.operator_visible_to(&viewer) {
                continue;
            }
            if !matches_mask(mask, user.nick()) && !matches_mask(mask, &user.mask()) {
                continue;
            }
            if !server.can_see_user(&id, &viewer, &client_id, &user) {
                continue;
            }
            send_who_line(server, &id, &viewer, "*", &user, "");
        }
    }

    server.numeric(
        &id,
        NumericReply::RplEndOfWho,
        vec![mask.to_string(), "End of /WHO list.".to_string()],
    );
    Ok(())
}

fn send_who_line(server: &Server, id: &ClientId, viewer: &User, channel: &str, user: &User, rank_prefix: &str) {
    let mut flags = String::from(if user.is_away() { "G" } else { "H" });
    if user.operator_visible_to(viewer) {
        flags.push('*');
    }
    if user.is_operator && user.has_mode('H') && viewer.is_operator {
        flags.push('!');
    }
    flags.push_str(rank_prefix);
    if user.has_mode('B') {
        flags.push('B');
    }
    if user.is_invisible() {
        flags.push('?');
    }

    server.numeric(
        id,
        NumericReply::RplWhoReply,
        vec![
            channel.to_string(),
            user.username().to_string(),
            user.host.clone(),
            server.name().to_string(),
            user.nick().to_string(),
            flags,
            format!("0 {}", user.realname),
        ],
    );
}

pub fn handle_version(server: &Server, id: ClientId, _message: &Message) -> Result<()> {
    let Some(nick) = server.user(&id).map(|user| user.nick().to_string()) else {
        return Ok(());
    };
    let config = server.config();
    server.numeric(
        &id,
        NumericReply::RplVersion,
        vec![
            config.server.version.clone(),
            server.name().to_string(),
            config.server.description.clone(),
        ],
    );
    send_isupport(server, &id, &nick);
    Ok(())
}

pub fn handle_lusers(server: &Server, id: ClientId, _message: &Message) -> Result<()> {
    if let Some(user) = server.user(&id) {
        send_lusers(server, &id, user.nick());
    }
    Ok(())
}

pub fn handle_motd(server: &Server, id: ClientId, _message: &Message) -> Result<()> {
    if let Some(user) = server.user(&id) {
        send_motd(server, &id, user.nick());
    }
    Ok(())
}

pub fn handle_userhost(server: &Server, id: ClientId, message: &Message) -> Result<()> {
    let registry = server.registry();
    let entries: Vec<String> = message
        .params
        .iter()
        .flat_map(|param| param.split(' '))
        .filter(|nick| !nick.is_empty())
        .take(5)
        .filter_map(|nick| registry.find_user(nick))
        .filter_map(|target| server.user(&target))
        .map(|user| {
            format!(
                "{}{}={}{}@{}",
                user.nick(),
                if user.is_operator { "*" } else { "" },
                if user.is_away() { '-' } else { '+' },
                user.username(),
                user.host
            )
        })
        .collect();

    server.numeric(&id, NumericReply::RplUserHost, vec![entries.join(" ")]);
    Ok(())
}

pub fn handle_mode(server: &Server, id: ClientId, message: &Message) -> Result<()> {
    let Some(user) = server.user(&id) else {
        return Ok(());
    };
    let target = &message.params[0];

    if let Some(handle) = server.registry().find_channel(target) {
        channel_mode(server, &id, &user, handle, message);
    } else if target.starts_with('#') {
        server.reply(&id, NumericReply::no_such_channel(user.nick(), target));
    } else {
        user_mode(server, &id, &user, message);
    }
    Ok(())
}

/// `MODE #chan b` and friends: every letter is a list letter and no masks follow
fn is_list_query(changes: &str, params: &[String]) -> bool {
    let mut letters = changes.chars().filter(|c| *c != '+' && *c != '-').peekable();
    params.is_empty() && letters.peek().is_some() && letters.all(|c| "beI".contains(c))
}

fn send_list(server: &Server, id: &ClientId, channel: &Channel, letter: char) {
    let (entry, end, text) = match letter {
        'b' => (NumericReply::RplBanList, NumericReply::RplEndOfBanList, "End of channel ban list"),
        'e' => (
            NumericReply::RplExceptList,
            NumericReply::RplEndOfExceptList,
            "End of channel exception list",
        ),
        _ => (
            NumericReply::RplInviteList,
            NumericReply::RplEndOfInviteList,
            "End of channel invite list",
        ),
    };

    for mask in channel.list(letter).into_iter().flatten() {
        server.numeric(id, entry, vec![channel.name.clone(), mask.clone()]);
    }
    server.numeric(id, end, vec![channel.name.clone(), text.to_string()]);
}

fn channel_mode(server: &Server, id: &ClientId, user: &User, handle: ChannelHandle, message: &Message) {
    let mut channel = handle.lock();
    let nick = user.nick();

    let Some(changes) = message.param(1) else {
        let mut params = vec![channel.name.clone()];
        params.extend(channel.mode_params(channel.is_member(id)));
        server.numeric(id, NumericReply::RplChannelModeIs, params);
        server.numeric(
            id,
            NumericReply::RplCreationTime,
            vec![channel.name.clone(), channel.created_at.timestamp().to_string()],
        );
        return;
    };
    let params = &message.params[2..];

    if is_list_query(changes, params) {
        let mut seen = Vec::new();
        for letter in changes.chars().filter(|c| *c != '+' && *c != '-') {
            if !seen.contains(&letter) {
                seen.push(letter);
                send_list(server, id, &channel, letter);
            }
        }
        return;
    }

    if !channel.has_rank_or_better(id, Rank::Operator) {
        server.reply(id, NumericReply::chanop_privs_needed(nick, &channel.name));
        return;
    }

    let registry = server.registry();
    let actor_rank = channel.highest_rank(id);
    let report = {
        let mut target = ChannelModeTarget {
            channel: &mut *channel,
            registry,
            actor_rank,
        };
        apply_mode_string(&CHANNEL_MODES, &mut target, changes, params)
    };

    for letter in report.rejected_with(Rejection::UnknownMode) {
        server.numeric(
            id,
            NumericReply::ErrUnknownMode,
            vec![
                letter.to_string(),
                format!("is unknown mode char to me for {}", channel.name),
            ],
        );
    }
    if report.rejected_with(Rejection::MissingParameter).next().is_some() {
        server.reply(id, NumericReply::need_more_params(nick, "MODE"));
    }
    if report.rejected_with(Rejection::Forbidden).next().is_some() {
        server.reply(id, NumericReply::chanop_privs_needed(nick, &channel.name));
    }

    if !report.change.is_empty() {
        let mut params = vec![channel.name.clone()];
        params.extend(report.change.to_params());
        let announcement = Message::with_prefix(user.prefix(), MessageType::Mode, params);
        channel.broadcast(registry, &announcement, None);
    }
}

fn user_mode(server: &Server, id: &ClientId, user: &User, message: &Message) {
    let nick = user.nick();
    let target = &message.params[0];

    match server.registry().find_user(target) {
        None => {
            server.reply(id, NumericReply::no_such_nick(nick, target));
            return;
        }
        Some(owner) if owner != *id => {
            server.numeric(
                id,
                NumericReply::ErrUsersDontMatch,
                vec!["Cant change mode for other users".to_string()],
            );
            return;
        }
        Some(_) => {}
    }

    let Some(changes) = message.param(1) else {
        server.numeric(id, NumericReply::RplUModeIs, vec![user.modes_string()]);
        return;
    };

    let Some(report) = server.registry().with_client_mut(id, |client| {
        apply_mode_string(&USER_MODES, &mut client.user, changes, &[])
    }) else {
        return;
    };

    if report.rejected_with(Rejection::UnknownMode).next().is_some() {
        server.numeric(
            id,
            NumericReply::ErrUModeUnknownFlag,
            vec!["Unknown MODE flag".to_string()],
        );
    }
    if !report.change.is_empty() {
        let mut params = vec![nick.to_string()];
        params.extend(report.change.to_params());
        server
            .registry()
            .send(id, Message::with_prefix(user.prefix(), MessageType::Mode, params));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_detection() {
        assert!(is_list_query("b", &[]));
        assert!(is_list_query("+bI", &[]));
        assert!(!is_list_query("b", &["*!*@spam".to_string()]));
        assert!(!is_list_query("+n", &[]));
        assert!(!is_list_query("+", &[]));
    }
}
