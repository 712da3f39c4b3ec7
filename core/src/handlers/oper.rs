//! OPER and KILL

use super::channel::handle_join;
use crate::{ClientId, Message, MessageType, NumericReply, Result, Server};
use tracing::{info, warn};

pub fn handle_oper(server: &Server, id: ClientId, message: &Message) -> Result<()> {
    let login = &message.params[0];
    let password = &message.params[1];

    if server.config().authenticate_operator(login, password).is_none() {
        warn!("Failed OPER attempt as {} from {}", login, id);
        server.numeric(&id, NumericReply::ErrNoOperHost, vec!["No O-lines for your host".to_string()]);
        return Ok(());
    }

    let Some(nick) = server.registry().with_client_mut(&id, |client| {
        client.user.grant_operator();
        client.nick().to_string()
    }) else {
        return Ok(());
    };
    info!("{} is now an IRC operator ({})", nick, login);

    server.numeric(&id, NumericReply::RplYoureOper, vec!["You are now an IRC operator".to_string()]);

    if let Some(ref channel) = server.config().channels.oper_channel {
        let join = Message::new(MessageType::Join, vec![channel.clone()]);
        handle_join(server, id, &join)?;
    }
    Ok(())
}

pub fn handle_kill(server: &Server, id: ClientId, message: &Message) -> Result<()> {
    let Some(killer) = server.user(&id) else {
        return Ok(());
    };
    if !killer.is_operator {
        server.reply(&id, NumericReply::no_privileges(killer.nick()));
        return Ok(());
    }

    let target_nick = &message.params[0];
    let reason = &message.params[1];
    let Some(victim) = server.registry().find_user(target_nick) else {
        server.reply(&id, NumericReply::no_such_nick(killer.nick(), target_nick));
        return Ok(());
    };
    let victim_nick = server
        .registry()
        .with_client(&victim, |client| client.nick().to_string())
        .unwrap_or_else(|| target_nick.to_string());

    let path = format!(
        "{}!{}!{} ({})",
        server.name(),
        killer.host,
        killer.nick(),
        reason
    );
    server.registry().send(
        &victim,
        Message::with_prefix(killer.prefix(), MessageType::Kill, vec![victim_nick.clone(), path]),
    );

    info!("{} killed {}: {}", killer.nick(), victim_nick, reason);
    server.disconnect(victim, &format!("Killed ({} ({}))", killer.nick(), reason));
    Ok(())
}
