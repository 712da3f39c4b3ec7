//! Message of the day

use crate::config::MotdConfig;
use crate::{Error, Message, NumericReply, Result};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// MOTD lines loaded once at startup
#[derive(Debug, Clone, Default)]
pub struct MotdManager {
    lines: Vec<String>,
}

impl MotdManager {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Load from the configured file, falling back to inline lines
    pub fn from_config(config: &MotdConfig) -> Result<Self> {
        match config.file {
            Some(ref file) => Self::load_motd(file),
            None => Ok(Self::new(config.lines.clone())),
        }
    }

    /// Load MOTD from a file; a missing file means no MOTD
    pub fn load_motd(motd_file: &str) -> Result<Self> {
        let path = Path::new(motd_file);
        if !path.exists() {
            warn!("MOTD file not found: {}", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read MOTD file: {}", e)))?;
        let lines: Vec<String> = content.lines().map(str::to_string).collect();
        info!("Loaded MOTD from {} ({} lines)", path.display(), lines.len());
        Ok(Self::new(lines))
    }

    pub fn is_enabled(&self) -> bool {
        !self.lines.is_empty()
    }

    /// The 375/372/376 sequence, or 422 when there is no MOTD
    pub fn messages(&self, server_name: &str, nick: &str) -> Vec<Message> {
        if !self.is_enabled() {
            return vec![NumericReply::ErrNoMotd.reply(nick, vec!["MOTD File is missing".to_string()])];
        }

        let mut messages = Vec::with_capacity(self.lines.len() + 2);
        messages.push(NumericReply::RplMotdStart.reply(
            nick,
            vec![format!("- {} Message of the Day -", server_name)],
        ));
        for line in &self.lines {
            messages.push(NumericReply::RplMotd.reply(nick, vec![format!("- {}", line)]));
        }
        messages.push(NumericReply::RplEndOfMotd.reply(nick, vec!["End of /MOTD command.".to_string()]));
        messages
    }
}
