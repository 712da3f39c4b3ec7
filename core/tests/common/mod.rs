//! Shared harness: sessions wired to in-memory queues instead of sockets

#![allow(dead_code)]

use ircrelay_core::{ClientId, Config, Message, Server};
use tokio::sync::mpsc;

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.name = "irc.test".to_string();
    config.network.name = "TestNet".to_string();
    config.motd.lines = vec!["Welcome to the test network".to_string()];
    config
}

pub struct Harness {
    pub server: Server,
}

pub struct TestClient {
    pub id: ClientId,
    receiver: mpsc::UnboundedReceiver<Message>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            server: Server::new(config).expect("test config is valid"),
        }
    }

    /// Open a session without registering it; the AUTH notices are discarded
    pub fn connect(&self) -> TestClient {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.server.connect("198.51.100.7:40000".to_string(), sender);
        let mut client = TestClient { id, receiver };
        client.drain();
        client
    }

    pub fn send(&self, client: &TestClient, line: &str) {
        self.server.handle_line(client.id, line);
    }

    /// Connect and fully register `nick`, discarding the welcome burst
    pub fn register(&self, nick: &str) -> TestClient {
        let mut client = self.connect();
        self.send(&client, &format!("NICK {}", nick));
        self.send(&client, &format!("USER {} 0 * :{} Example", nick, nick));
        client.drain();
        client
    }
}

impl TestClient {
    /// Every queued line, serialized
    pub fn drain(&mut self) -> Vec<String> {
        std::iter::from_fn(|| self.receiver.try_recv().ok())
            .map(|message| message.to_string())
            .collect()
    }

    /// Verbs (or numeric codes) of every queued line
    pub fn drain_commands(&mut self) -> Vec<String> {
        std::iter::from_fn(|| self.receiver.try_recv().ok())
            .map(|message| message.command.to_string())
            .collect()
    }
}
