//! Configuration management

use crate::modes::{ModeClass, CHANNEL_MODES, USER_MODES};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server information
    pub server: ServerConfig,
    /// Network information
    pub network: NetworkConfig,
    /// Per-client and per-channel limits
    pub limits: LimitsConfig,
    /// Channel defaults
    pub channels: ChannelsConfig,
    /// User defaults
    pub users: UsersConfig,
    /// Operator credentials
    pub operators: Vec<OperatorConfig>,
    /// Message of the day
    pub motd: MotdConfig,
    /// Connection settings
    pub connection: ConnectionConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server name, used as the origin of every server reply
    pub name: String,
    /// Server description shown in WHOIS
    pub description: String,
    /// Server version
    pub version: String,
    /// Server creation date
    pub created: String,
    /// Address to listen on
    pub bind_address: String,
    /// Port to listen on
    pub port: u16,
    /// Maximum number of simultaneous connections
    pub max_clients: usize,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Network name
    pub name: String,
}

/// Protocol limits advertised in ISUPPORT and enforced by the handlers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_nick_length: usize,
    pub max_channel_length: usize,
    pub max_channels_per_client: usize,
    pub max_channels: usize,
    pub max_topic_length: usize,
    pub max_kick_length: usize,
    pub max_away_length: usize,
    /// Maximum comma separated targets of PRIVMSG and NOTICE
    pub max_targets: usize,
}

/// Channel defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    /// Boolean modes a freshly created channel starts with
    pub default_modes: String,
    /// Channel newly opered clients are joined to
    pub oper_channel: Option<String>,
}

/// User defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UsersConfig {
    /// Personal modes granted right after registration
    pub default_modes: String,
}

/// Operator credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Login name, compared case-insensitively
    pub login: String,
    /// Password (SHA256 hex digest)
    pub password_hash: String,
}

/// Message of the day source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MotdConfig {
    /// File to read the MOTD from
    pub file: Option<String>,
    /// Inline MOTD lines, used when no file is configured
    pub lines: Vec<String>,
}

/// Connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Seconds of silence before the server sends a PING
    pub ping_interval: u64,
    /// Seconds of silence before the connection is dropped
    pub ping_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "irc.localhost".to_string(),
            description: "ircrelay chat server".to_string(),
            version: format!("ircrelay-{}", env!("CARGO_PKG_VERSION")),
            created: chrono::Utc::now().format("%a %b %e %Y at %H:%M:%S UTC").to_string(),
            bind_address: "0.0.0.0".to_string(),
            port: 6667,
            max_clients: 1000,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: "RelayNet".to_string(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_nick_length: 30,
            max_channel_length: 50,
            max_channels_per_client: 20,
            max_channels: 500,
            max_topic_length: 300,
            max_kick_length: 300,
            max_away_length: 200,
            max_targets: 4,
        }
    }
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            default_modes: "ns".to_string(),
            oper_channel: None,
        }
    }
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            default_modes: "iwx".to_string(),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            ping_interval: 60,
            ping_timeout: 180,
        }
    }
}

impl OperatorConfig {
    /// Create an operator entry from a plaintext password
    pub fn new(login: &str, password: &str) -> Self {
        Self {
            login: login.to_string(),
            password_hash: PasswordHasher::hash_password(password),
        }
    }

    /// Check a login/password pair against this entry
    pub fn matches(&self, login: &str, password: &str) -> bool {
        self.login.eq_ignore_ascii_case(login)
            && PasswordHasher::verify_password(password, &self.password_hash)
    }
}

/// Password hashing utilities
pub struct PasswordHasher;

impl PasswordHasher {
    /// Hash a password using SHA256
    pub fn hash_password(password: &str) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(password.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Verify a password against its hash
    pub fn verify_password(password: &str, hash: &str) -> bool {
        Self::hash_password(password).eq_ignore_ascii_case(hash)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.name.is_empty() || self.server.name.contains(' ') {
            return Err(Error::Config(
                "Server name must be non-empty and contain no spaces".to_string(),
            ));
        }

        if self.network.name.is_empty() {
            return Err(Error::Config("Network name cannot be empty".to_string()));
        }

        if self.server.port == 0 {
            return Err(Error::Config("Port cannot be 0".to_string()));
        }

        if self.limits.max_nick_length == 0 {
            return Err(Error::Config("max_nick_length must be at least 1".to_string()));
        }

        if self.limits.max_channel_length < 2 {
            return Err(Error::Config("max_channel_length must be at least 2".to_string()));
        }

        if self.limits.max_targets == 0 {
            return Err(Error::Config("max_targets must be at least 1".to_string()));
        }

        for letter in self.channels.default_modes.chars() {
            if CHANNEL_MODES.classify(letter) != Some(ModeClass::Boolean) {
                return Err(Error::Config(format!(
                    "Default channel mode '{}' is not a boolean channel mode",
                    letter
                )));
            }
        }

        for letter in self.users.default_modes.chars() {
            if letter == 'o' || USER_MODES.classify(letter).is_none() {
                return Err(Error::Config(format!(
                    "Default user mode '{}' cannot be granted at registration",
                    letter
                )));
            }
        }

        if let Some(ref channel) = self.channels.oper_channel {
            if !channel.starts_with('#') {
                return Err(Error::Config(format!(
                    "Oper channel '{}' must start with '#'",
                    channel
                )));
            }
        }

        if self.connection.ping_timeout <= self.connection.ping_interval {
            return Err(Error::Config(
                "ping_timeout must be greater than ping_interval".to_string(),
            ));
        }

        for oper in &self.operators {
            if oper.login.is_empty() {
                return Err(Error::Config("Operator login cannot be empty".to_string()));
            }
            if oper.password_hash.len() != 64 {
                return Err(Error::Config(format!(
                    "Operator '{}' password_hash must be a SHA256 hex digest",
                    oper.login
                )));
            }
        }

        Ok(())
    }

    /// Find the operator entry matching a login/password pair
    pub fn authenticate_operator(&self, login: &str, password: &str) -> Option<&OperatorConfig> {
        self.operators.iter().find(|oper| oper.matches(login, password))
    }
}
