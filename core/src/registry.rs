//! Process-wide directory of sessions, nicknames and channels
//!
//! Sessions live in an arena keyed by [`ClientId`]; nicknames and channel
//! names map to ids and channels through case-folded keys. Lock order is
//! channel map, then a channel, then a client. Client locks are never held
//! while acquiring anything else.

use crate::utils::string::fold;
use crate::{Channel, Client, ClientId, Error, Message, Prefix, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared handle to a session
pub type ClientHandle = Arc<RwLock<Client>>;

/// Shared handle to a channel
pub type ChannelHandle = Arc<Mutex<Channel>>;

/// Case-folded channel name to channel
pub type ChannelMap = HashMap<String, ChannelHandle>;

/// Directory of every live session and channel
#[derive(Default)]
pub struct Registry {
    clients: DashMap<ClientId, ClientHandle>,
    nicks: DashMap<String, ClientId>,
    channels: RwLock<ChannelMap>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a freshly accepted session to the arena
    pub fn add_client(&self, client: Client) -> ClientHandle {
        let id = client.id;
        let handle = Arc::new(RwLock::new(client));
        self.clients.insert(id, handle.clone());
        handle
    }

    /// Drop a session from the arena and release its nickname
    pub fn remove_client(&self, id: &ClientId) -> Option<ClientHandle> {
        let (_, handle) = self.clients.remove(id)?;
        let nick = handle.read().user.nick.clone();
        if let Some(nick) = nick {
            self.nicks.remove_if(&fold(&nick), |_, owner| owner == id);
        }
        Some(handle)
    }

    pub fn client(&self, id: &ClientId) -> Option<ClientHandle> {
        self.clients.get(id).map(|entry| entry.value().clone())
    }

    /// Run `f` with the client read-locked
    pub fn with_client<R>(&self, id: &ClientId, f: impl FnOnce(&Client) -> R) -> Option<R> {
        let handle = self.client(id)?;
        let client = handle.read();
        Some(f(&client))
    }

    /// Run `f` with the client write-locked
    pub fn with_client_mut<R>(&self, id: &ClientId, f: impl FnOnce(&mut Client) -> R) -> Option<R> {
        let handle = self.client(id)?;
        let mut client = handle.write();
        Some(f(&mut client))
    }

    pub fn client_ids(&self) -> Vec<ClientId> {
        self.clients.iter().map(|entry| *entry.key()).collect()
    }

    /// Every live connection, registered or not
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Registered sessions
    pub fn user_count(&self) -> usize {
        self.nicks.len()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.read().len()
    }

    /// Queue `message` for `id`; false when the session is gone
    pub fn send(&self, id: &ClientId, message: Message) -> bool {
        let Some(handle) = self.client(id) else {
            return false;
        };
        let result = handle.read().send(message);
        match result {
            Ok(()) => true,
            Err(e) => {
                debug!("Dropping message for {}: {}", id, e);
                false
            }
        }
    }

    /// Resolve a registered nickname
    pub fn find_user(&self, nick: &str) -> Option<ClientId> {
        self.nicks.get(&fold(nick)).map(|entry| *entry.value())
    }

    /// Claim `nick` for `id`; fails if another session owns it
    pub fn register_nick(&self, id: ClientId, nick: &str) -> Result<()> {
        match self.nicks.entry(fold(nick)) {
            Entry::Occupied(entry) if *entry.get() != id => {
                Err(Error::NicknameInUse(nick.to_string()))
            }
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(entry) => {
                entry.insert(id);
                Ok(())
            }
        }
    }

    /// Move `id` from `old` to `new`; a case change of one's own nick is allowed
    pub fn rename_nick(&self, id: ClientId, old: &str, new: &str) -> Result<()> {
        self.register_nick(id, new)?;
        if fold(old) != fold(new) {
            self.nicks.remove_if(&fold(old), |_, owner| *owner == id);
        }
        Ok(())
    }

    pub fn channels(&self) -> RwLockReadGuard<'_, ChannelMap> {
        self.channels.read()
    }

    /// Write access to the channel map; held across membership changes
    pub fn channels_mut(&self) -> RwLockWriteGuard<'_, ChannelMap> {
        self.channels.write()
    }

    pub fn find_channel(&self, name: &str) -> Option<ChannelHandle> {
        self.channels.read().get(&fold(name)).cloned()
    }

    /// Existing channel, or a new empty one; the flag tells which
    pub fn find_or_create_channel(
        &self,
        map: &mut ChannelMap,
        name: &str,
        default_modes: &str,
    ) -> (ChannelHandle, bool) {
        match map.get(&fold(name)) {
            Some(channel) => (channel.clone(), false),
            None => {
                let channel = Arc::new(Mutex::new(Channel::new(name.to_string(), default_modes)));
                map.insert(fold(name), channel.clone());
                info!("Channel {} created", name);
                (channel, true)
            }
        }
    }

    /// Drop the channel from the map if its last member left
    pub fn remove_if_empty(&self, map: &mut ChannelMap, channel: &Channel) -> bool {
        if !channel.is_empty() {
            return false;
        }
        map.remove(&channel.key_name());
        info!("Channel {} destroyed: Channel empty", channel.name);
        true
    }

    /// Kick every member of `name` with `origin` as the kicker and drop it
    pub fn destroy_channel(&self, map: &mut ChannelMap, name: &str, origin: &Prefix, reason: &str) -> bool {
        let Some(handle) = map.remove(&fold(name)) else {
            warn!("Cannot destroy unknown channel {}", name);
            return false;
        };

        let mut channel = handle.lock();
        let members: Vec<ClientId> = channel.members().to_vec();
        for member in members {
            let nick = self
                .with_client(&member, |client| client.nick().to_string())
                .unwrap_or_else(|| "*".to_string());
            channel.kick(self, &member, &nick, origin.clone(), reason);
        }
        info!("Channel {} destroyed: {}", channel.name, reason);
        true
    }
}
