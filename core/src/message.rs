//! Protocol line parsing and serialization
//!
//! Lines follow the RFC 1459 shape: an optional `:prefix`, a verb, then
//! space separated arguments where the first ` :` starts a trailing argument
//! that runs to the end of the line.

use std::fmt;

/// Origin of a message (server or user)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prefix {
    /// Server name
    Server(String),
    /// User prefix (nick!user@host)
    User {
        nick: String,
        user: String,
        host: String,
    },
}

impl Prefix {
    fn parse(raw: &str) -> Self {
        match raw.split_once('!') {
            Some((nick, rest)) => match rest.split_once('@') {
                Some((user, host)) => Prefix::User {
                    nick: nick.to_string(),
                    user: user.to_string(),
                    host: host.to_string(),
                },
                None => Prefix::Server(raw.to_string()),
            },
            None => Prefix::Server(raw.to_string()),
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::Server(name) => write!(f, "{}", name),
            Prefix::User { nick, user, host } => write!(f, "{}!{}@{}", nick, user, host),
        }
    }
}

/// Verbs understood or emitted by the server
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageType {
    // Registration
    Nick,
    User,
    Oper,
    Quit,

    // Channel operations
    Join,
    Part,
    Mode,
    Topic,
    Names,
    List,
    Invite,
    Kick,

    // Server queries
    Version,
    Motd,
    Lusers,

    // Messaging
    PrivMsg,
    Notice,

    // User queries
    Who,
    Whois,
    Userhost,

    // Miscellaneous
    Kill,
    Ping,
    Pong,
    Error,
    Away,

    /// Numerics and verbs the server does not know
    Custom(String),
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageType::Nick => "NICK",
            MessageType::User => "USER",
            MessageType::Oper => "OPER",
            MessageType::Quit => "QUIT",
            MessageType::Join => "JOIN",
            MessageType::Part => "PART",
            MessageType::Mode => "MODE",
            MessageType::Topic => "TOPIC",
            MessageType::Names => "NAMES",
            MessageType::List => "LIST",
            MessageType::Invite => "INVITE",
            MessageType::Kick => "KICK",
            MessageType::Version => "VERSION",
            MessageType::Motd => "MOTD",
            MessageType::Lusers => "LUSERS",
            MessageType::PrivMsg => "PRIVMSG",
            MessageType::Notice => "NOTICE",
            MessageType::Who => "WHO",
            MessageType::Whois => "WHOIS",
            MessageType::Userhost => "USERHOST",
            MessageType::Kill => "KILL",
            MessageType::Ping => "PING",
            MessageType::Pong => "PONG",
            MessageType::Error => "ERROR",
            MessageType::Away => "AWAY",
            MessageType::Custom(cmd) => cmd,
        };
        write!(f, "{}", s)
    }
}

impl From<&str> for MessageType {
    fn from(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "NICK" => MessageType::Nick,
            "USER" => MessageType::User,
            "OPER" => MessageType::Oper,
            "QUIT" => MessageType::Quit,
            "JOIN" => MessageType::Join,
            "PART" => MessageType::Part,
            "MODE" => MessageType::Mode,
            "TOPIC" => MessageType::Topic,
            "NAMES" => MessageType::Names,
            "LIST" => MessageType::List,
            "INVITE" => MessageType::Invite,
            "KICK" => MessageType::Kick,
            "VERSION" => MessageType::Version,
            "MOTD" => MessageType::Motd,
            "LUSERS" => MessageType::Lusers,
            "PRIVMSG" => MessageType::PrivMsg,
            "NOTICE" => MessageType::Notice,
            "WHO" => MessageType::Who,
            "WHOIS" => MessageType::Whois,
            "USERHOST" => MessageType::Userhost,
            "KILL" => MessageType::Kill,
            "PING" => MessageType::Ping,
            "PONG" => MessageType::Pong,
            "ERROR" => MessageType::Error,
            "AWAY" => MessageType::Away,
            _ => MessageType::Custom(s.to_string()),
        }
    }
}

/// A single protocol line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Optional prefix (server or user)
    pub prefix: Option<Prefix>,
    /// Message command/type
    pub command: MessageType,
    /// Message parameters, the trailing argument included
    pub params: Vec<String>,
}

impl Message {
    /// Create a new message
    pub fn new(command: MessageType, params: Vec<String>) -> Self {
        Self {
            prefix: None,
            command,
            params,
        }
    }

    /// Create a new message with prefix
    pub fn with_prefix(prefix: Prefix, command: MessageType, params: Vec<String>) -> Self {
        Self {
            prefix: Some(prefix),
            command,
            params,
        }
    }

    /// Parse one line, with or without its line terminator
    pub fn parse(input: &str) -> crate::Result<Self> {
        let mut rest = input.trim_end_matches(['\r', '\n']).trim_start_matches(' ');
        if rest.is_empty() {
            return Err(crate::Error::MessageParse("Empty message".to_string()));
        }

        let prefix = match rest.strip_prefix(':') {
            Some(stripped) => {
                let (raw, remainder) = stripped.split_once(' ').unwrap_or((stripped, ""));
                rest = remainder.trim_start_matches(' ');
                Some(Prefix::parse(raw))
            }
            None => None,
        };

        let (head, trailing) = match rest.find(" :") {
            Some(idx) => (&rest[..idx], Some(&rest[idx + 2..])),
            None => (rest, None),
        };

        let mut tokens = head.split(' ').filter(|token| !token.is_empty());
        let command = tokens
            .next()
            .map(MessageType::from)
            .ok_or_else(|| crate::Error::MessageParse("No command found".to_string()))?;

        let mut params: Vec<String> = tokens.map(str::to_string).collect();
        if let Some(trailing) = trailing {
            params.push(trailing.to_string());
        }

        Ok(Message {
            prefix,
            command,
            params,
        })
    }

    /// Serialized line including the CRLF terminator
    pub fn to_line(&self) -> String {
        format!("{}\r\n", self)
    }

    /// Parameter at `index`, if present
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref prefix) = self.prefix {
            write!(f, ":{} ", prefix)?;
        }
        write!(f, "{}", self.command)?;

        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            let needs_colon =
                i == last && (param.is_empty() || param.contains(' ') || param.starts_with(':'));
            if needs_colon {
                write!(f, " :{}", param)?;
            } else {
                write!(f, " {}", param)?;
            }
        }
        Ok(())
    }
}
