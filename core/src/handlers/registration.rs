//! NICK, USER, QUIT, PING, PONG and the welcome burst

use super::peers_of;
use crate::mode_change::apply_mode_string;
use crate::modes::{chanmodes_token, prefix_token, CHANNEL_MODES, USER_MODES};
use crate::{ClientId, ClientState, Error, Message, MessageType, NumericReply, Result, Server};
use tracing::info;

pub fn handle_nick(server: &Server, id: ClientId, message: &Message) -> Result<()> {
    let Some((user, registered)) = server
        .registry()
        .with_client(&id, |client| (client.user.clone(), client.is_registered()))
    else {
        return Ok(());
    };

    let Some(new_nick) = message.param(0).filter(|nick| !nick.is_empty()) else {
        server.numeric(&id, NumericReply::ErrNoNicknameGiven, vec!["No nickname given".to_string()]);
        return Ok(());
    };

    if !server.names().is_valid_nickname(new_nick) {
        server.reply(&id, NumericReply::erroneous_nickname(user.nick(), new_nick));
        return Ok(());
    }

    if server.registry().find_user(new_nick).is_some_and(|owner| owner != id) {
        server.reply(&id, NumericReply::nickname_in_use(user.nick(), new_nick));
        return Ok(());
    }

    if user.nick.as_deref() == Some(new_nick) {
        return Ok(());
    }

    if !registered {
        server.registry().with_client_mut(&id, |client| {
            client.user.nick = Some(new_nick.to_string());
        });
        return try_register(server, id);
    }

    let old_nick = user.nick().to_string();
    match server.registry().rename_nick(id, &old_nick, new_nick) {
        Ok(()) => {}
        Err(Error::NicknameInUse(_)) => {
            server.reply(&id, NumericReply::nickname_in_use(&old_nick, new_nick));
            return Ok(());
        }
        Err(e) => return Err(e),
    }

    let notice = Message::with_prefix(user.prefix(), MessageType::Nick, vec![new_nick.to_string()]);
    server.registry().send(&id, notice.clone());
    for peer in peers_of(server, &id, &user.channels) {
        server.registry().send(&peer, notice.clone());
    }

    server.registry().with_client_mut(&id, |client| {
        client.user.nick = Some(new_nick.to_string());
    });
    info!("{} is now known as {}", old_nick, new_nick);
    Ok(())
}

pub fn handle_user(server: &Server, id: ClientId, message: &Message) -> Result<()> {
    let Some((already_set, nick)) = server.registry().with_client(&id, |client| {
        (
            client.is_registered() || client.user.username.is_some(),
            client.nick().to_string(),
        )
    }) else {
        return Ok(());
    };

    if already_set {
        server.numeric(&id, NumericReply::ErrAlreadyRegistered, vec!["You may not reregister".to_string()]);
        return Ok(());
    }

    let ident = &message.params[0];
    let realname = &message.params[3];
    if ident.is_empty() {
        server.reply(&id, NumericReply::need_more_params(&nick, "USER"));
        return Ok(());
    }

    server.registry().with_client_mut(&id, |client| {
        client.user.username = Some(ident.clone());
        client.user.realname = realname.clone();
    });
    try_register(server, id)
}

/// Complete registration once both NICK and USER are in
fn try_register(server: &Server, id: ClientId) -> Result<()> {
    let Some(Some(nick)) = server.registry().with_client(&id, |client| {
        (client.state == ClientState::Unregistered && client.user.has_identity())
            .then(|| client.nick().to_string())
    }) else {
        return Ok(());
    };

    match server.registry().register_nick(id, &nick) {
        Ok(()) => {}
        Err(Error::NicknameInUse(_)) => {
            server.reply(&id, NumericReply::nickname_in_use("*", &nick));
            server.registry().with_client_mut(&id, |client| client.user.nick = None);
            return Ok(());
        }
        Err(e) => return Err(e),
    }

    let Some(mask) = server.registry().with_client_mut(&id, |client| {
        client.state = ClientState::Registered;
        client.user.mask()
    }) else {
        return Ok(());
    };
    server.note_user_count();
    info!("Client {} registered as {}", id, mask);

    send_welcome(server, &id, &nick, &mask);
    grant_default_modes(server, &id);
    Ok(())
}

fn send_welcome(server: &Server, id: &ClientId, nick: &str, mask: &str) {
    let config = server.config();
    let version = &config.server.version;

    server.numeric(
        id,
        NumericReply::RplWelcome,
        vec![format!("Welcome to the {} IRC Network {}", config.network.name, mask)],
    );
    server.numeric(
        id,
        NumericReply::RplYourHost,
        vec![format!("Your host is {}, running version {}", server.name(), version)],
    );
    server.numeric(
        id,
        NumericReply::RplCreated,
        vec![format!("This server was created {}", config.server.created)],
    );
    server.numeric(
        id,
        NumericReply::RplMyInfo,
        vec![
            server.name().to_string(),
            version.clone(),
            USER_MODES.letters(),
            CHANNEL_MODES.letters(),
        ],
    );
    send_isupport(server, id, nick);
    send_lusers(server, id, nick);
    send_motd(server, id, nick);
}

fn grant_default_modes(server: &Server, id: &ClientId) {
    let defaults = &server.config().users.default_modes;
    if defaults.is_empty() {
        return;
    }

    let Some((prefix, nick, report)) = server.registry().with_client_mut(id, |client| {
        let report = apply_mode_string(&USER_MODES, &mut client.user, &format!("+{}", defaults), &[]);
        (client.prefix(), client.nick().to_string(), report)
    }) else {
        return;
    };

    if !report.change.is_empty() {
        let mut params = vec![nick];
        params.extend(report.change.to_params());
        server
            .registry()
            .send(id, Message::with_prefix(prefix, MessageType::Mode, params));
    }
}

/// The two RPL_ISUPPORT lines
pub(crate) fn send_isupport(server: &Server, id: &ClientId, nick: &str) {
    let config = server.config();
    let limits = &config.limits;
    let supported = "are supported by this server".to_string();

    let mut first = vec![
        "CHANTYPES=#".to_string(),
        format!("PREFIX={}", prefix_token()),
        format!("CHANMODES={}", chanmodes_token()),
        format!("CHANLIMIT=#:{}", limits.max_channels_per_client),
        format!("MAXCHANNELS={}", limits.max_channels_per_client),
        format!("NICKLEN={}", limits.max_nick_length),
        format!("CHANNELLEN={}", limits.max_channel_length),
        format!("TOPICLEN={}", limits.max_topic_length),
        format!("KICKLEN={}", limits.max_kick_length),
        format!("AWAYLEN={}", limits.max_away_length),
        format!("MAXTARGETS={}", limits.max_targets),
    ];
    first.push(supported.clone());
    server.reply(id, NumericReply::RplISupport.reply(nick, first));

    let second = vec![
        format!("NETWORK={}", config.network.name.replace(' ', "-")),
        "CASEMAPPING=ascii".to_string(),
        "EXCEPTS".to_string(),
        "INVEX".to_string(),
        supported,
    ];
    server.reply(id, NumericReply::RplISupport.reply(nick, second));
}

/// The LUSERS block
pub(crate) fn send_lusers(server: &Server, id: &ClientId, nick: &str) {
    let registry = server.registry();
    let mut users = 0;
    let mut invisible = 0;
    let mut operators = 0;
    for client_id in registry.client_ids() {
        let flags = registry.with_client(&client_id, |client| {
            (client.is_registered(), client.user.is_invisible(), client.user.is_operator)
        });
        if let Some((true, is_invisible, is_operator)) = flags {
            users += 1;
            invisible += usize::from(is_invisible);
            operators += usize::from(is_operator);
        }
    }
    let connections = registry.client_count();
    let unknown = connections.saturating_sub(users);
    let max = server.max_users().max(users);

    let replies = [
        (
            NumericReply::RplLuserClient,
            vec![format!(
                "There are {} users and {} invisible on 1 servers",
                users - invisible,
                invisible
            )],
        ),
        (
            NumericReply::RplLuserOp,
            vec![operators.to_string(), "operator(s) online".to_string()],
        ),
        (
            NumericReply::RplLuserUnknown,
            vec![unknown.to_string(), "unknown connection(s)".to_string()],
        ),
        (
            NumericReply::RplLuserChannels,
            vec![registry.channel_count().to_string(), "channels formed".to_string()],
        ),
        (
            NumericReply::RplLuserMe,
            vec![format!("I have {} clients and 0 servers", connections)],
        ),
        (
            NumericReply::RplLocalUsers,
            vec![
                users.to_string(),
                max.to_string(),
                format!("Current local users {}, max {}", users, max),
            ],
        ),
        (
            NumericReply::RplGlobalUsers,
            vec![
                users.to_string(),
                max.to_string(),
                format!("Current global users {}, max {}", users, max),
            ],
        ),
    ];

    for (numeric, params) in replies {
        if numeric == NumericReply::RplLuserUnknown && unknown == 0 {
            continue;
        }
        server.reply(id, numeric.reply(nick, params));
    }
}

pub(crate) fn send_motd(server: &Server, id: &ClientId, nick: &str) {
    for message in server.motd().messages(server.name(), nick) {
        server.reply(id, message);
    }
}

pub fn handle_quit(server: &Server, id: ClientId, message: &Message) -> Result<()> {
    let reason = message.param(0).unwrap_or("Client quit");
    server.disconnect(id, reason);
    Ok(())
}

pub fn handle_ping(server: &Server, id: ClientId, message: &Message) -> Result<()> {
    let token = message.params[0].clone();
    server.reply(
        &id,
        Message::new(MessageType::Pong, vec![server.name().to_string(), token]),
    );
    Ok(())
}

/// Activity was already recorded when the line arrived
pub fn handle_pong(_server: &Server, _id: ClientId, _message: &Message) -> Result<()> {
    Ok(())
}
