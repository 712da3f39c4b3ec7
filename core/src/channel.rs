//! Channel state: membership, privilege ranks, access lists and topic

use crate::mode_change::{ModeOutcome, ModeRequest, ModeTarget, Rejection};
use crate::modes::{ModeClass, Rank};
use crate::utils::string::{fold, matches_mask};
use crate::{ClientId, Message, MessageType, Prefix, Registry};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;
use uuid::Uuid;

/// Channel topic
#[derive(Debug, Clone)]
pub struct Topic {
    pub text: String,
    /// Nick of the client that set it
    pub author: String,
    pub set_at: DateTime<Utc>,
}

/// A channel
#[derive(Debug)]
pub struct Channel {
    /// Unique channel ID
    pub id: Uuid,
    /// Channel name as first created
    pub name: String,
    /// Creation time of the mode state
    pub created_at: DateTime<Utc>,
    /// Boolean modes
    pub modes: BTreeSet<char>,
    /// Channel key (+k)
    pub key: Option<String>,
    /// Member limit (+l)
    pub limit: Option<usize>,
    pub topic: Option<Topic>,
    /// Members in join order
    members: Vec<ClientId>,
    /// One ordered list per rank, indexed by `Rank::index`
    privileges: [Vec<ClientId>; 5],
    /// Ban masks (+b)
    pub bans: Vec<String>,
    /// Ban exception masks (+e)
    pub excepts: Vec<String>,
    /// Invite exception masks (+I)
    pub invex: Vec<String>,
    /// Pending INVITEs, consumed on join
    invited: HashSet<ClientId>,
}

impl Channel {
    /// Create an empty channel with the given boolean modes
    pub fn new(name: String, default_modes: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            created_at: Utc::now(),
            modes: default_modes.chars().collect(),
            key: None,
            limit: None,
            topic: None,
            members: Vec::new(),
            privileges: Default::default(),
            bans: Vec::new(),
            excepts: Vec::new(),
            invex: Vec::new(),
            invited: HashSet::new(),
        }
    }

    /// Case-folded registry key
    pub fn key_name(&self) -> String {
        fold(&self.name)
    }

    pub fn members(&self) -> &[ClientId] {
        &self.members
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_member(&self, id: &ClientId) -> bool {
        self.members.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn has_mode(&self, mode: char) -> bool {
        self.modes.contains(&mode)
    }

    /// Hidden from listings (+p or +s)
    pub fn is_hidden(&self) -> bool {
        self.has_mode('p') || self.has_mode('s')
    }

    /// Add a member, returning false if already present
    pub fn add_member(&mut self, id: ClientId) -> bool {
        if self.is_member(&id) {
            return false;
        }
        self.members.push(id);
        self.invited.remove(&id);
        true
    }

    /// Remove a member and purge it from every privilege list
    pub fn remove_member(&mut self, id: &ClientId) -> bool {
        let Some(pos) = self.members.iter().position(|m| m == id) else {
            return false;
        };
        self.members.remove(pos);
        for list in self.privileges.iter_mut() {
            list.retain(|m| m != id);
        }
        self.invited.remove(id);
        true
    }

    pub fn has_rank(&self, id: &ClientId, rank: Rank) -> bool {
        self.privileges[rank.index()].contains(id)
    }

    /// Highest rank held, if any
    pub fn highest_rank(&self, id: &ClientId) -> Option<Rank> {
        Rank::ALL.into_iter().find(|rank| self.has_rank(id, *rank))
    }

    /// Whether the member holds `rank` or any rank above it
    pub fn has_rank_or_better(&self, id: &ClientId, rank: Rank) -> bool {
        self.highest_rank(id).is_some_and(|held| held >= rank)
    }

    /// Grant a rank to a member; false if not a member or already held
    pub fn grant(&mut self, id: ClientId, rank: Rank) -> bool {
        if !self.is_member(&id) || self.has_rank(&id, rank) {
            return false;
        }
        self.privileges[rank.index()].push(id);
        true
    }

    /// Revoke a rank; false if not held
    pub fn revoke(&mut self, id: &ClientId, rank: Rank) -> bool {
        let list = &mut self.privileges[rank.index()];
        let before = list.len();
        list.retain(|m| m != id);
        list.len() != before
    }

    /// Prefix of the highest rank held, empty for plain members
    pub fn prefix_for(&self, id: &ClientId) -> String {
        self.highest_rank(id)
            .map(|rank| rank.prefix().to_string())
            .unwrap_or_default()
    }

    /// Mode letters plus their parameters, for RPL_CHANNELMODEIS
    pub fn mode_params(&self, show_key: bool) -> Vec<String> {
        let mut letters: String = self.modes.iter().collect();
        let mut params = Vec::new();
        if let Some(ref key) = self.key {
            letters.push('k');
            if show_key {
                params.push(key.clone());
            }
        }
        if let Some(limit) = self.limit {
            letters.push('l');
            params.push(limit.to_string());
        }

        let mut out = vec![format!("+{}", letters)];
        out.extend(params);
        out
    }

    pub fn set_topic(&mut self, text: String, author: String) {
        self.topic = Some(Topic {
            text,
            author,
            set_at: Utc::now(),
        });
    }

    /// Mask list for `b`, `e` or `I`
    pub fn list(&self, letter: char) -> Option<&Vec<String>> {
        match letter {
            'b' => Some(&self.bans),
            'e' => Some(&self.excepts),
            'I' => Some(&self.invex),
            _ => None,
        }
    }

    fn list_mut(&mut self, letter: char) -> Option<&mut Vec<String>> {
        match letter {
            'b' => Some(&mut self.bans),
            'e' => Some(&mut self.excepts),
            'I' => Some(&mut self.invex),
            _ => None,
        }
    }

    /// Banned and not covered by an exception
    pub fn is_banned(&self, mask: &str) -> bool {
        self.bans.iter().any(|ban| matches_mask(ban, mask))
            && !self.excepts.iter().any(|except| matches_mask(except, mask))
    }

    /// Invited by INVITE or covered by an invite exception
    pub fn is_invited(&self, id: &ClientId, mask: &str) -> bool {
        self.invited.contains(id) || self.invex.iter().any(|entry| matches_mask(entry, mask))
    }

    pub fn invite(&mut self, id: ClientId) {
        self.invited.insert(id);
    }

    /// Deliver `message` to every member except `except`
    pub fn broadcast(&self, registry: &Registry, message: &Message, except: Option<&ClientId>) {
        for member in &self.members {
            if Some(member) == except {
                continue;
            }
            registry.send(member, message.clone());
        }
    }

    /// Add `id` and announce it to the whole resulting membership
    pub fn join(&mut self, registry: &Registry, id: ClientId, who: Prefix) -> bool {
        if !self.add_member(id) {
            return false;
        }
        let key = self.key_name();
        let attached = registry.with_client_mut(&id, |client| {
            client.user.channels.insert(key);
        });
        if attached.is_none() {
            // The session was torn down while the join was in flight
            self.remove_member(&id);
            return false;
        }

        let message = Message::with_prefix(who, MessageType::Join, vec![self.name.clone()]);
        self.broadcast(registry, &message, None);
        debug!("{} joined {} ({} members)", id, self.name, self.members.len());
        true
    }

    /// Announce the departure to everyone, the leaver included, then remove
    pub fn part(&mut self, registry: &Registry, id: &ClientId, who: Prefix, reason: &str) {
        let message = Message::with_prefix(
            who,
            MessageType::Part,
            vec![self.name.clone(), reason.to_string()],
        );
        self.broadcast(registry, &message, None);
        self.detach(registry, id);
    }

    /// Announce a kick to everyone, the target included, then remove it
    pub fn kick(
        &mut self,
        registry: &Registry,
        target: &ClientId,
        target_nick: &str,
        kicker: Prefix,
        reason: &str,
    ) {
        let message = Message::with_prefix(
            kicker,
            MessageType::Kick,
            vec![self.name.clone(), target_nick.to_string(), reason.to_string()],
        );
        self.broadcast(registry, &message, None);
        self.detach(registry, target);
    }

    /// Remove a member without any notification
    pub fn detach(&mut self, registry: &Registry, id: &ClientId) {
        if self.remove_member(id) {
            let key = self.key_name();
            registry.with_client_mut(id, |client| {
                client.user.channels.remove(&key);
            });
        }
    }
}

/// A channel viewed as a mode target on behalf of one member
pub struct ChannelModeTarget<'a> {
    pub channel: &'a mut Channel,
    pub registry: &'a Registry,
    /// Highest rank of the member issuing the change
    pub actor_rank: Option<Rank>,
}

impl ChannelModeTarget<'_> {
    fn apply_rank(&mut self, rank: Rank, adding: bool, nick: &str) -> ModeOutcome {
        if self.actor_rank.map_or(true, |held| held < rank.max(Rank::Operator)) {
            return ModeOutcome::Invalid(Rejection::Forbidden);
        }

        let Some(id) = self.registry.find_user(nick) else {
            return ModeOutcome::NoOp;
        };
        if !self.channel.is_member(&id) {
            return ModeOutcome::NoOp;
        }

        let changed = if adding {
            self.channel.grant(id, rank)
        } else {
            self.channel.revoke(&id, rank)
        };

        if changed {
            let canonical = self
                .registry
                .with_client(&id, |client| client.nick().to_string())
                .unwrap_or_else(|| nick.to_string());
            ModeOutcome::Applied(Some(canonical))
        } else {
            ModeOutcome::NoOp
        }
    }

    fn apply_list(&mut self, letter: char, adding: bool, mask: &str) -> ModeOutcome {
        let Some(list) = self.channel.list_mut(letter) else {
            return ModeOutcome::Invalid(Rejection::UnknownMode);
        };
        let present = list.iter().position(|entry| entry.eq_ignore_ascii_case(mask));

        match (adding, present) {
            (true, None) => {
                list.push(mask.to_string());
                ModeOutcome::Applied(Some(mask.to_string()))
            }
            (false, Some(pos)) => {
                let removed = list.remove(pos);
                ModeOutcome::Applied(Some(removed))
            }
            _ => ModeOutcome::NoOp,
        }
    }
}

impl ModeTarget for ChannelModeTarget<'_> {
    fn apply_mode(&mut self, request: &ModeRequest<'_>) -> ModeOutcome {
        let adding = request.adding;
        match (request.class, request.param) {
            (ModeClass::Boolean, _) => {
                let changed = if adding {
                    self.channel.modes.insert(request.letter)
                } else {
                    self.channel.modes.remove(&request.letter)
                };
                if changed {
                    ModeOutcome::Applied(None)
                } else {
                    ModeOutcome::NoOp
                }
            }
            (ModeClass::ParameterAlways, Some(key)) => {
                if adding {
                    if self.channel.key.is_some() {
                        return ModeOutcome::NoOp;
                    }
                    if key.is_empty() || key.contains(',') {
                        return ModeOutcome::Invalid(Rejection::BadParameter);
                    }
                    self.channel.key = Some(key.to_string());
                    ModeOutcome::Applied(Some(key.to_string()))
                } else {
                    match self.channel.key.take() {
                        Some(_) => ModeOutcome::Applied(Some(key.to_string())),
                        None => ModeOutcome::NoOp,
                    }
                }
            }
            (ModeClass::ParameterOnSet, Some(raw)) => match raw.parse::<usize>() {
                Ok(0) | Err(_) => ModeOutcome::Invalid(Rejection::BadParameter),
                Ok(limit) if self.channel.limit == Some(limit) => ModeOutcome::NoOp,
                Ok(limit) => {
                    self.channel.limit = Some(limit);
                    ModeOutcome::Applied(Some(limit.to_string()))
                }
            },
            (ModeClass::ParameterOnSet, None) => match self.channel.limit.take() {
                Some(_) => ModeOutcome::Applied(None),
                None => ModeOutcome::NoOp,
            },
            (ModeClass::ListEntry, Some(mask)) => self.apply_list(request.letter, adding, mask),
            (ModeClass::PrivilegeRank, Some(nick)) => match Rank::from_letter(request.letter) {
                Some(rank) => self.apply_rank(rank, adding, nick),
                None => ModeOutcome::Invalid(Rejection::UnknownMode),
            },
            _ => ModeOutcome::Invalid(Rejection::MissingParameter),
        }
    }

    fn value(&self, letter: char) -> Option<String> {
        match letter {
            'k' => self.channel.key.clone(),
            'l' => self.channel.limit.map(|limit| limit.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_satisfies_every_lower_predicate() {
        let mut channel = Channel::new("#test".to_string(), "ns");
        let owner = Uuid::new_v4();
        channel.add_member(owner);
        assert!(channel.grant(owner, Rank::Owner));

        for rank in Rank::ALL {
            assert!(channel.has_rank_or_better(&owner, rank), "owner fails {}", rank);
        }
        assert!(!channel.has_rank(&owner, Rank::Operator));
    }

    #[test]
    fn test_rank_predicates_are_monotone() {
        let mut channel = Channel::new("#test".to_string(), "");
        let halfop = Uuid::new_v4();
        channel.add_member(halfop);
        channel.grant(halfop, Rank::HalfOperator);

        assert!(channel.has_rank_or_better(&halfop, Rank::Voice));
        assert!(channel.has_rank_or_better(&halfop, Rank::HalfOperator));
        assert!(!channel.has_rank_or_better(&halfop, Rank::Operator));
        assert_eq!(channel.prefix_for(&halfop), "%");
    }

    #[test]
    fn test_removal_purges_privileges_but_keeps_access_lists() {
        let mut channel = Channel::new("#test".to_string(), "");
        let member = Uuid::new_v4();
        channel.add_member(member);
        channel.grant(member, Rank::Operator);
        channel.grant(member, Rank::Voice);
        channel.bans.push("*!*@spam".to_string());

        assert!(channel.remove_member(&member));
        assert!(channel.is_empty());
        assert_eq!(channel.highest_rank(&member), None);
        assert_eq!(channel.bans.len(), 1);
        assert!(!channel.grant(member, Rank::Operator));
    }

    #[test]
    fn test_join_of_torn_down_session_is_undone() {
        let registry = Registry::new();
        let mut channel = Channel::new("#test".to_string(), "");
        let gone = Uuid::new_v4();
        let who = Prefix::User {
            nick: "ghost".to_string(),
            user: "ghost".to_string(),
            host: "198.51.100.7".to_string(),
        };

        assert!(!channel.join(&registry, gone, who));
        assert!(channel.is_empty());
        assert!(!channel.is_member(&gone));
    }

    #[test]
    fn test_key_cleared_and_restored_is_no_change() {
        use crate::mode_change::apply_mode_string;
        use crate::modes::CHANNEL_MODES;

        let registry = Registry::new();
        let mut channel = Channel::new("#test".to_string(), "");
        channel.key = Some("sekrit".to_string());
        let params = vec!["sekrit".to_string(), "sekrit".to_string()];
        let mut target = ChannelModeTarget {
            channel: &mut channel,
            registry: &registry,
            actor_rank: Some(Rank::Operator),
        };

        let report = apply_mode_string(&CHANNEL_MODES, &mut target, "-k+k", &params);
        assert!(report.change.is_empty());
        assert_eq!(report.consumed, 2);
        assert_eq!(channel.key.as_deref(), Some("sekrit"));
    }

    #[test]
    fn test_ban_exceptions() {
        let mut channel = Channel::new("#test".to_string(), "");
        channel.bans.push("*!*@*.example.com".to_string());
        assert!(channel.is_banned("alice!al@irc.example.com"));

        channel.excepts.push("alice!*@*".to_string());
        assert!(!channel.is_banned("alice!al@irc.example.com"));
        assert!(channel.is_banned("bob!b@irc.example.com"));
    }

    #[test]
    fn test_mode_params_hide_key_from_outsiders() {
        let mut channel = Channel::new("#test".to_string(), "nt");
        channel.key = Some("sekrit".to_string());
        channel.limit = Some(10);

        assert_eq!(channel.mode_params(true), vec!["+ntkl", "sekrit", "10"]);
        assert_eq!(channel.mode_params(false), vec!["+ntkl", "10"]);
    }
}
