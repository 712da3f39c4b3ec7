//! Utility functions and helpers

use crate::config::LimitsConfig;
use crate::{Error, Result};
use regex::Regex;

/// String utilities
pub mod string {
    /// Case-fold a nick or channel name (CASEMAPPING=ascii)
    pub fn fold(name: &str) -> String {
        name.to_ascii_lowercase()
    }

    /// Case-insensitive glob match supporting `*` and `?`
    pub fn matches_mask(pattern: &str, text: &str) -> bool {
        let pattern = pattern.as_bytes();
        let text = text.as_bytes();
        let (mut p, mut t) = (0, 0);
        let mut star: Option<(usize, usize)> = None;

        while t < text.len() {
            if p < pattern.len()
                && (pattern[p] == b'?' || pattern[p].eq_ignore_ascii_case(&text[t]))
            {
                p += 1;
                t += 1;
            } else if p < pattern.len() && pattern[p] == b'*' {
                star = Some((p, t));
                p += 1;
            } else if let Some((star_p, star_t)) = star {
                p = star_p + 1;
                t = star_t + 1;
                star = Some((star_p, star_t + 1));
            } else {
                return false;
            }
        }

        pattern[p..].iter().all(|&c| c == b'*')
    }

    /// Cut `text` to at most `max` bytes on a character boundary
    pub fn truncate(text: &str, max: usize) -> &str {
        if text.len() <= max {
            return text;
        }
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        &text[..end]
    }
}

/// Nickname and channel name grammar, sized by the configured limits
#[derive(Debug, Clone)]
pub struct NameRules {
    nick: Regex,
    channel: Regex,
}

impl NameRules {
    pub fn new(limits: &LimitsConfig) -> Result<Self> {
        let nick = Regex::new(&format!(
            r"^[a-zA-Z\[\]_|`^][a-zA-Z0-9\[\]_|`^]{{0,{}}}$",
            limits.max_nick_length.saturating_sub(1)
        ))
        .map_err(|e| Error::Config(format!("Invalid nickname pattern: {}", e)))?;

        let channel = Regex::new(&format!(
            r##"^#[a-zA-Z0-9`~!@#$%^&*()'";|}}{{\]\[.<>?]{{0,{}}}$"##,
            limits.max_channel_length.saturating_sub(1)
        ))
        .map_err(|e| Error::Config(format!("Invalid channel pattern: {}", e)))?;

        Ok(Self { nick, channel })
    }

    pub fn is_valid_nickname(&self, nick: &str) -> bool {
        self.nick.is_match(nick)
    }

    pub fn is_valid_channel_name(&self, name: &str) -> bool {
        self.channel.is_match(name)
    }
}
