//! Verb to handler table

use crate::handlers::{channel, messaging, oper, query, registration};
use crate::{ClientId, Message, NumericReply, Result, Server};
use std::collections::HashMap;

/// A command handler
pub type Handler = fn(&Server, ClientId, &Message) -> Result<()>;

/// One table entry
#[derive(Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub handler: Handler,
    /// Parameters required before the handler runs (461 otherwise)
    pub min_params: usize,
    /// Accepted from unregistered sessions
    pub before_registration: bool,
}

impl CommandSpec {
    pub const fn new(name: &'static str, handler: Handler, min_params: usize) -> Self {
        Self {
            name,
            handler,
            min_params,
            before_registration: false,
        }
    }

    pub const fn before_registration(mut self) -> Self {
        self.before_registration = true;
        self
    }
}

/// Routing table keyed by upper-case verb
#[derive(Default)]
pub struct CommandTable {
    commands: HashMap<&'static str, CommandSpec>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command the server understands
    pub fn standard() -> Self {
        let mut table = Self::new();
        for spec in [
            CommandSpec::new("NICK", registration::handle_nick, 0).before_registration(),
            CommandSpec::new("USER", registration::handle_user, 4).before_registration(),
            CommandSpec::new("QUIT", registration::handle_quit, 0).before_registration(),
            CommandSpec::new("PONG", registration::handle_pong, 0).before_registration(),
            CommandSpec::new("PING", registration::handle_ping, 1),
            CommandSpec::new("AWAY", query::handle_away, 0),
            CommandSpec::new("OPER", oper::handle_oper, 2),
            CommandSpec::new("KILL", oper::handle_kill, 2),
            CommandSpec::new("WHOIS", query::handle_whois, 1),
            CommandSpec::new("WHO", query::handle_who, 0),
            CommandSpec::new("LIST", channel::handle_list, 0),
            CommandSpec::new("NAMES", channel::handle_names, 0),
            CommandSpec::new("VERSION", query::handle_version, 0),
            CommandSpec::new("LUSERS", query::handle_lusers, 0),
            CommandSpec::new("MOTD", query::handle_motd, 0),
            CommandSpec::new("USERHOST", query::handle_userhost, 1),
            CommandSpec::new("PRIVMSG", messaging::handle_privmsg, 0),
            CommandSpec::new("NOTICE", messaging::handle_notice, 0),
            CommandSpec::new("JOIN", channel::handle_join, 1),
            CommandSpec::new("PART", channel::handle_part, 1),
            CommandSpec::new("KICK", channel::handle_kick, 2),
            CommandSpec::new("TOPIC", channel::handle_topic, 1),
            CommandSpec::new("INVITE", channel::handle_invite, 2),
            CommandSpec::new("MODE", query::handle_mode, 1),
        ] {
            table.register(spec);
        }
        table
    }

    pub fn register(&mut self, spec: CommandSpec) {
        self.commands.insert(spec.name, spec);
    }

    pub fn get(&self, verb: &str) -> Option<&CommandSpec> {
        self.commands.get(verb.to_ascii_uppercase().as_str())
    }

    /// Route `message` to its handler, enforcing registration and arity
    pub fn dispatch(&self, server: &Server, id: ClientId, message: &Message) -> Result<()> {
        let verb = message.command.to_string().to_ascii_uppercase();
        let Some((registered, nick)) = server
            .registry()
            .with_client(&id, |client| (client.is_registered(), client.nick().to_string()))
        else {
            return Ok(());
        };

        let spec = self.get(&verb);
        if !registered && !spec.is_some_and(|spec| spec.before_registration) {
            server.reply(&id, NumericReply::not_registered(&nick));
            return Ok(());
        }

        let Some(spec) = spec else {
            server.reply(&id, NumericReply::unknown_command(&nick, &verb));
            return Ok(());
        };

        if message.params.len() < spec.min_params {
            server.reply(&id, NumericReply::need_more_params(&nick, spec.name));
            return Ok(());
        }

        (spec.handler)(server, id, message)
    }
}
