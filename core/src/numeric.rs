//! Numeric replies as assigned by RFC 1459 and RFC 2812

use crate::{Message, MessageType};

/// Numeric reply codes used by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum NumericReply {
    // Connection registration
    RplWelcome = 1,
    RplYourHost = 2,
    RplCreated = 3,
    RplMyInfo = 4,
    RplISupport = 5,

    // Personal modes and lusers
    RplUModeIs = 221,
    RplLuserClient = 251,
    RplLuserOp = 252,
    RplLuserUnknown = 253,
    RplLuserChannels = 254,
    RplLuserMe = 255,
    RplLocalUsers = 265,
    RplGlobalUsers = 266,

    // Query replies
    RplAway = 301,
    RplUserHost = 302,
    RplUnAway = 305,
    RplNowAway = 306,
    RplWhoisUser = 311,
    RplWhoisServer = 312,
    RplWhoisOperator = 313,
    RplEndOfWho = 315,
    RplWhoisIdle = 317,
    RplEndOfWhois = 318,
    RplWhoisChannels = 319,
    RplListStart = 321,
    RplList = 322,
    RplListEnd = 323,
    RplChannelModeIs = 324,
    RplCreationTime = 329,
    RplNoTopic = 331,
    RplTopic = 332,
    RplTopicWhoTime = 333,
    RplInviting = 341,
    RplInviteList = 346,
    RplEndOfInviteList = 347,
    RplExceptList = 348,
    RplEndOfExceptList = 349,
    RplVersion = 351,
    RplWhoReply = 352,
    RplNamReply = 353,
    RplEndOfNames = 366,
    RplBanList = 367,
    RplEndOfBanList = 368,
    RplMotd = 372,
    RplMotdStart = 375,
    RplEndOfMotd = 376,
    RplWhoisHost = 378,
    RplWhoisModes = 379,
    RplYoureOper = 381,

    // Errors
    ErrNoSuchNick = 401,
    ErrNoSuchChannel = 403,
    ErrCannotSendToChan = 404,
    ErrTooManyChannels = 405,
    ErrTooManyTargets = 407,
    ErrNoRecipient = 411,
    ErrNoTextToSend = 412,
    ErrUnknownCommand = 421,
    ErrNoMotd = 422,
    ErrNoNicknameGiven = 431,
    ErrErroneousNickname = 432,
    ErrNicknameInUse = 433,
    ErrUserNotInChannel = 441,
    ErrNotOnChannel = 442,
    ErrUserOnChannel = 443,
    ErrNotRegistered = 451,
    ErrNeedMoreParams = 461,
    ErrAlreadyRegistered = 462,
    ErrChannelIsFull = 471,
    ErrUnknownMode = 472,
    ErrInviteOnlyChan = 473,
    ErrBannedFromChan = 474,
    ErrBadChannelKey = 475,
    ErrNoPrivileges = 481,
    ErrChanOPrivsNeeded = 482,
    ErrNoOperHost = 491,
    ErrUModeUnknownFlag = 501,
    ErrUsersDontMatch = 502,
}

impl NumericReply {
    /// Numeric value of the reply
    pub fn numeric_code(&self) -> u16 {
        *self as u16
    }

    /// Three digit wire form of the reply
    pub fn code(&self) -> String {
        format!("{:03}", self.numeric_code())
    }

    /// Build the reply addressed to `target`; the caller stamps the origin
    pub fn reply(&self, target: &str, params: Vec<String>) -> Message {
        let mut all_params = Vec::with_capacity(params.len() + 1);
        all_params.push(target.to_string());
        all_params.extend(params);

        Message::new(MessageType::Custom(self.code()), all_params)
    }

    /// ERR_NOSUCHNICK
    pub fn no_such_nick(target: &str, nick: &str) -> Message {
        Self::ErrNoSuchNick.reply(target, vec![nick.to_string(), "No such nick/channel".to_string()])
    }

    /// ERR_NOSUCHCHANNEL
    pub fn no_such_channel(target: &str, channel: &str) -> Message {
        Self::ErrNoSuchChannel.reply(target, vec![channel.to_string(), "No such channel".to_string()])
    }

    /// ERR_NOTONCHANNEL
    pub fn not_on_channel(target: &str, channel: &str) -> Message {
        Self::ErrNotOnChannel.reply(
            target,
            vec![channel.to_string(), "You're not on that channel".to_string()],
        )
    }

    /// ERR_CHANOPRIVSNEEDED
    pub fn chanop_privs_needed(target: &str, channel: &str) -> Message {
        Self::ErrChanOPrivsNeeded.reply(
            target,
            vec![channel.to_string(), "You're not channel operator".to_string()],
        )
    }

    /// ERR_NEEDMOREPARAMS
    pub fn need_more_params(target: &str, command: &str) -> Message {
        Self::ErrNeedMoreParams.reply(
            target,
            vec![command.to_string(), "Not enough parameters".to_string()],
        )
    }

    /// ERR_NOTREGISTERED
    pub fn not_registered(target: &str) -> Message {
        Self::ErrNotRegistered.reply(target, vec!["You have not registered".to_string()])
    }

    /// ERR_UNKNOWNCOMMAND
    pub fn unknown_command(target: &str, command: &str) -> Message {
        Self::ErrUnknownCommand.reply(target, vec![command.to_string(), "Unknown command".to_string()])
    }

    /// ERR_NICKNAMEINUSE
    pub fn nickname_in_use(target: &str, nick: &str) -> Message {
        Self::ErrNicknameInUse.reply(
            target,
            vec![nick.to_string(), "Nickname is already in use".to_string()],
        )
    }

    /// ERR_ERRONEUSNICKNAME
    pub fn erroneous_nickname(target: &str, nick: &str) -> Message {
        Self::ErrErroneousNickname.reply(
            target,
            vec![nick.to_string(), "Erroneous nickname".to_string()],
        )
    }

    /// ERR_NOPRIVILEGES
    pub fn no_privileges(target: &str) -> Message {
        Self::ErrNoPrivileges.reply(
            target,
            vec!["Permission Denied- You're not an IRC operator".to_string()],
        )
    }

    /// RPL_ENDOFNAMES
    pub fn end_of_names(target: &str, channel: &str) -> Message {
        Self::RplEndOfNames.reply(target, vec![channel.to_string(), "End of /NAMES list.".to_string()])
    }

    /// RPL_NOTOPIC
    pub fn no_topic(target: &str, channel: &str) -> Message {
        Self::RplNoTopic.reply(target, vec![channel.to_string(), "No topic is set.".to_string()])
    }
}
