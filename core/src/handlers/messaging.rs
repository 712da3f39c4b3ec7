//! PRIVMSG and NOTICE delivery

use crate::modes::Rank;
use crate::{ClientId, Message, MessageType, NumericReply, Result, Server, User};

pub fn handle_privmsg(server: &Server, id: ClientId, message: &Message) -> Result<()> {
    deliver(server, id, message, MessageType::PrivMsg)
}

pub fn handle_notice(server: &Server, id: ClientId, message: &Message) -> Result<()> {
    deliver(server, id, message, MessageType::Notice)
}

fn deliver(server: &Server, id: ClientId, message: &Message, kind: MessageType) -> Result<()> {
    let Some(sender) = server.user(&id) else {
        return Ok(());
    };

    let Some(targets) = message.param(0).filter(|t| !t.is_empty()) else {
        server.numeric(
            &id,
            NumericReply::ErrNoRecipient,
            vec![format!("No recipient given ({})", kind)],
        );
        return Ok(());
    };
    let Some(text) = message.param(1).filter(|t| !t.is_empty()) else {
        server.numeric(&id, NumericReply::ErrNoTextToSend, vec!["No text to send".to_string()]);
        return Ok(());
    };

    let targets: Vec<&str> = targets.split(',').filter(|t| !t.is_empty()).collect();
    if targets.len() > server.config().limits.max_targets {
        server.numeric(
            &id,
            NumericReply::ErrTooManyTargets,
            vec![targets.join(","), "Too many recipients".to_string()],
        );
        return Ok(());
    }

    for target in targets {
        if !send_to_channel(server, &id, &sender, target, text, &kind) {
            send_to_user(server, &id, &sender, target, text, &kind);
        }
    }
    Ok(())
}

/// Deliver to a channel named `target`; false when no such channel exists
fn send_to_channel(server: &Server, id: &ClientId, sender: &User, target: &str, text: &str, kind: &MessageType) -> bool {
    let Some(handle) = server.registry().find_channel(target) else {
        return false;
    };
    let channel = handle.lock();

    let is_member = channel.is_member(id);
    let voiced = channel.has_rank_or_better(id, Rank::Voice);
    let blocked = (channel.has_mode('n') && !is_member)
        || (channel.has_mode('m') && !voiced)
        || (!voiced && channel.is_banned(&sender.mask()));
    if blocked {
        // NOTICE is dropped without a reply
        if *kind == MessageType::Notice {
            return true;
        }
        server.numeric(
            id,
            NumericReply::ErrCannotSendToChan,
            vec![channel.name.clone(), "Cannot send to channel".to_string()],
        );
        return true;
    }

    let outgoing = Message::with_prefix(
        sender.prefix(),
        kind.clone(),
        vec![channel.name.clone(), text.to_string()],
    );
    channel.broadcast(server.registry(), &outgoing, Some(id));
    true
}

fn send_to_user(server: &Server, id: &ClientId, sender: &User, target: &str, text: &str, kind: &MessageType) {
    let registry = server.registry();
    let recipient = registry
        .find_user(target)
        .and_then(|target_id| server.user(&target_id).map(|user| (target_id, user)));
    let Some((target_id, recipient)) = recipient else {
        server.reply(id, NumericReply::no_such_nick(sender.nick(), target));
        return;
    };

    let outgoing = Message::with_prefix(
        sender.prefix(),
        kind.clone(),
        vec![recipient.nick().to_string(), text.to_string()],
    );
    registry.send(&target_id, outgoing);

    if *kind == MessageType::PrivMsg {
        if let Some(ref away) = recipient.away_message {
            server.numeric(
                id,
                NumericReply::RplAway,
                vec![recipient.nick().to_string(), away.clone()],
            );
        }
    }
}
