//! Server state and session lifecycle

use crate::commands::CommandTable;
use crate::utils::NameRules;
use crate::{
    Client, ClientId, Config, Message, MessageType, MotdManager, NumericReply, Prefix, Registry,
    Result, User,
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// The relay server: configuration, registry and command table
pub struct Server {
    config: Arc<Config>,
    registry: Registry,
    commands: CommandTable,
    names: NameRules,
    motd: MotdManager,
    started_at: DateTime<Utc>,
    max_users: AtomicUsize,
}

impl Server {
    /// Create a server from a validated configuration
    pub fn new(config: Config) -> Result<Self> {
        let names = NameRules::new(&config.limits)?;
        let motd = MotdManager::from_config(&config.motd)?;

        Ok(Self {
            config: Arc::new(config),
            registry: Registry::new(),
            commands: CommandTable::standard(),
            names,
            motd,
            started_at: Utc::now(),
            max_users: AtomicUsize::new(0),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn names(&self) -> &NameRules {
        &self.names
    }

    pub fn motd(&self) -> &MotdManager {
        &self.motd
    }

    /// Server name, the origin of every server reply
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Highest registered user count seen so far
    pub fn max_users(&self) -> usize {
        self.max_users.load(Ordering::Relaxed)
    }

    pub(crate) fn note_user_count(&self) {
        self.max_users
            .fetch_max(self.registry.user_count(), Ordering::Relaxed);
    }

    /// Accept a new session whose outbound queue is `sender`
    pub fn connect(&self, remote_addr: String, sender: mpsc::UnboundedSender<Message>) -> ClientId {
        let id = Uuid::new_v4();
        let client = Client::new(id, remote_addr, sender);
        for text in ["*** Looking up your hostname...", "*** Found your hostname"] {
            let notice = Message::with_prefix(
                Prefix::Server(self.name().to_string()),
                MessageType::Notice,
                vec!["AUTH".to_string(), text.to_string()],
            );
            // The receiver is still owned by the caller at this point
            let _ = client.send(notice);
        }
        info!("Client {} connected from {}", id, client.remote_addr);
        self.registry.add_client(client);
        id
    }

    pub fn is_connected(&self, id: &ClientId) -> bool {
        self.registry.client(id).is_some()
    }

    /// Process one inbound line for `id`
    pub fn handle_line(&self, id: ClientId, line: &str) {
        if line.trim().is_empty() {
            return;
        }

        let message = match Message::parse(line) {
            Ok(message) => message,
            Err(e) => {
                debug!("Ignoring unparsable line from {}: {}", id, e);
                return;
            }
        };

        if self
            .registry
            .with_client_mut(&id, |client| client.user.update_activity())
            .is_none()
        {
            return;
        }

        if let Err(e) = self.commands.dispatch(self, id, &message) {
            error!("Error handling {} from {}: {}", message.command, id, e);
            self.disconnect(id, "Error occurred");
        }
    }

    /// Tear a session down: leave every channel, tell each peer once, drop it
    pub fn disconnect(&self, id: ClientId, reason: &str) {
        // Holding the channel map for the whole teardown keeps a concurrent
        // JOIN from attaching the session to a channel behind our back
        let mut channels = self.registry.channels_mut();
        let Some(handle) = self.registry.client(&id) else {
            return;
        };
        let (user, registered) = {
            let client = handle.read();
            (client.user.clone(), client.is_registered())
        };

        let mut peers: HashSet<ClientId> = HashSet::new();
        for key in &user.channels {
            let Some(channel) = channels.get(key).cloned() else {
                continue;
            };
            let mut channel = channel.lock();
            peers.extend(channel.members().iter().copied().filter(|m| *m != id));
            channel.detach(&self.registry, &id);
            self.registry.remove_if_empty(&mut channels, &channel);
        }

        if registered {
            let quit = Message::with_prefix(
                user.prefix(),
                MessageType::Quit,
                vec![reason.to_string()],
            );
            for peer in &peers {
                self.registry.send(peer, quit.clone());
            }
        }

        self.registry.remove_client(&id);
        drop(channels);

        let closing = Message::new(
            MessageType::Error,
            vec![format!("Closing Link: {}[{}] ({})", user.nick(), user.host, reason)],
        );
        let _ = handle.read().send(closing);
        drop(handle);

        info!("Client {} ({}) disconnected: {}", id, user.nick(), reason);
    }

    /// Destroy every channel and drop every session
    pub fn shutdown(&self, reason: &str) {
        {
            let mut channels = self.registry.channels_mut();
            let origin = Prefix::Server(self.name().to_string());
            let names: Vec<String> = channels.keys().cloned().collect();
            for name in names {
                self.registry.destroy_channel(&mut channels, &name, &origin, reason);
            }
        }

        for id in self.registry.client_ids() {
            self.disconnect(id, reason);
        }
        info!("Server shut down: {}", reason);
    }

    /// Copy of a session's identity
    pub fn user(&self, id: &ClientId) -> Option<User> {
        self.registry.with_client(id, |client| client.user.clone())
    }

    /// Send a prepared server reply to `id`
    pub fn reply(&self, id: &ClientId, mut message: Message) {
        message.prefix = Some(Prefix::Server(self.name().to_string()));
        self.registry.send(id, message);
    }

    /// Send a numeric addressed to the session's current nick
    pub fn numeric(&self, id: &ClientId, numeric: NumericReply, params: Vec<String>) {
        let Some(nick) = self
            .registry
            .with_client(id, |client| client.nick().to_string())
        else {
            return;
        };
        self.reply(id, numeric.reply(&nick, params));
    }

    /// Whether `viewer` may see `target` in directory queries
    pub fn can_see_user(&self, viewer_id: &ClientId, viewer: &User, target_id: &ClientId, target: &User) -> bool {
        viewer_id == target_id
            || viewer.is_operator
            || !target.is_invisible()
            || !viewer.channels.is_disjoint(&target.channels)
    }
}
