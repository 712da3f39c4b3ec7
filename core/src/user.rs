//! Per-session identity and personal modes

use crate::mode_change::{ModeOutcome, ModeRequest, ModeTarget, Rejection};
use crate::Prefix;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashSet};

/// Identity and personal state of one connection
#[derive(Debug, Clone)]
pub struct User {
    /// Nickname, once NICK succeeded
    pub nick: Option<String>,
    /// Ident, once USER succeeded; never changes afterwards
    pub username: Option<String>,
    /// Real name from USER
    pub realname: String,
    /// Hostname/IP
    pub host: String,
    /// Connection time
    pub connected_at: DateTime<Utc>,
    /// Last time a line was received
    pub last_activity: DateTime<Utc>,
    /// Personal modes
    pub modes: BTreeSet<char>,
    /// Case-folded names of the channels this user is in
    pub channels: HashSet<String>,
    /// Whether OPER succeeded
    pub is_operator: bool,
    /// Away message (if any)
    pub away_message: Option<String>,
}

impl User {
    /// Create a fresh, unidentified user connected from `host`
    pub fn new(host: String) -> Self {
        let now = Utc::now();
        Self {
            nick: None,
            username: None,
            realname: String::new(),
            host,
            connected_at: now,
            last_activity: now,
            modes: BTreeSet::new(),
            channels: HashSet::new(),
            is_operator: false,
            away_message: None,
        }
    }

    /// Nickname, or `*` before one is set
    pub fn nick(&self) -> &str {
        self.nick.as_deref().unwrap_or("*")
    }

    /// Ident, or `*` before one is set
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or("*")
    }

    /// Get user prefix for messages
    pub fn prefix(&self) -> Prefix {
        Prefix::User {
            nick: self.nick().to_string(),
            user: self.username().to_string(),
            host: self.host.clone(),
        }
    }

    /// `nick!user@host`, the form access masks are matched against
    pub fn mask(&self) -> String {
        self.prefix().to_string()
    }

    /// Both registration prerequisites are present
    pub fn has_identity(&self) -> bool {
        self.nick.is_some() && self.username.is_some()
    }

    pub fn has_mode(&self, mode: char) -> bool {
        self.modes.contains(&mode)
    }

    pub fn is_invisible(&self) -> bool {
        self.has_mode('i')
    }

    /// Personal modes as `+abc`
    pub fn modes_string(&self) -> String {
        format!("+{}", self.modes.iter().collect::<String>())
    }

    pub fn set_away(&mut self, message: Option<String>) {
        self.away_message = message;
    }

    pub fn is_away(&self) -> bool {
        self.away_message.is_some()
    }

    /// Update last activity time
    pub fn update_activity(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Seconds since the last received line
    pub fn idle_seconds(&self) -> i64 {
        (Utc::now() - self.last_activity).num_seconds().max(0)
    }

    /// Whether `viewer` gets to see that this user is an operator
    pub fn operator_visible_to(&self, viewer: &User) -> bool {
        self.is_operator && (!self.has_mode('H') || viewer.is_operator)
    }

    /// Grant operator status and the matching personal mode
    pub fn grant_operator(&mut self) {
        self.is_operator = true;
        self.modes.insert('o');
    }
}

impl ModeTarget for User {
    fn apply_mode(&mut self, request: &ModeRequest<'_>) -> ModeOutcome {
        // Operator status is only granted through OPER
        if request.letter == 'o' && request.adding {
            return ModeOutcome::Invalid(Rejection::Forbidden);
        }

        let changed = if request.adding {
            self.modes.insert(request.letter)
        } else {
            self.modes.remove(&request.letter)
        };

        if !changed {
            return ModeOutcome::NoOp;
        }

        if request.letter == 'o' {
            self.is_operator = false;
        }
        ModeOutcome::Applied(None)
    }
}
