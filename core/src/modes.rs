//! Mode grammar tables
//!
//! Every personal and channel mode letter is classified once here. The mode
//! change engine uses the class to decide how many positional parameters an
//! occurrence consumes.

use std::fmt;

/// How a mode letter behaves when set or cleared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeClass {
    /// Plain flag, no parameter
    Boolean,
    /// Parameter required on set and clear (channel key)
    ParameterAlways,
    /// Parameter required on set only (member limit)
    ParameterOnSet,
    /// Mask list entry (ban, exception, invite exception)
    ListEntry,
    /// Member privilege rank, parameter is a member nick
    PrivilegeRank,
}

impl ModeClass {
    /// Whether an occurrence with this sign consumes a parameter
    pub fn takes_parameter(self, adding: bool) -> bool {
        match self {
            ModeClass::Boolean => false,
            ModeClass::ParameterOnSet => adding,
            ModeClass::ParameterAlways | ModeClass::ListEntry | ModeClass::PrivilegeRank => true,
        }
    }
}

/// Channel member privilege ranks, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    Voice,
    HalfOperator,
    Operator,
    Protected,
    Owner,
}

impl Rank {
    /// All ranks, highest first
    pub const ALL: [Rank; 5] = [
        Rank::Owner,
        Rank::Protected,
        Rank::Operator,
        Rank::HalfOperator,
        Rank::Voice,
    ];

    /// Mode letter granting this rank
    pub fn letter(self) -> char {
        match self {
            Rank::Owner => 'q',
            Rank::Protected => 'a',
            Rank::Operator => 'o',
            Rank::HalfOperator => 'h',
            Rank::Voice => 'v',
        }
    }

    /// Nick prefix shown in NAMES and WHO
    pub fn prefix(self) -> char {
        match self {
            Rank::Owner => '~',
            Rank::Protected => '&',
            Rank::Operator => '@',
            Rank::HalfOperator => '%',
            Rank::Voice => '+',
        }
    }

    pub fn from_letter(letter: char) -> Option<Rank> {
        Rank::ALL.into_iter().find(|rank| rank.letter() == letter)
    }

    /// Slot of this rank in a channel's privilege lists
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rank::Owner => "owner",
            Rank::Protected => "protected",
            Rank::Operator => "operator",
            Rank::HalfOperator => "half-operator",
            Rank::Voice => "voice",
        };
        write!(f, "{}", name)
    }
}

/// A static letter to class table
#[derive(Debug)]
pub struct ModeGrammar {
    entries: &'static [(char, ModeClass)],
}

impl ModeGrammar {
    /// Class of `letter`, or `None` when the letter is unknown
    pub fn classify(&self, letter: char) -> Option<ModeClass> {
        self.entries
            .iter()
            .find(|(candidate, _)| *candidate == letter)
            .map(|(_, class)| *class)
    }

    /// Every known letter, in table order
    pub fn letters(&self) -> String {
        self.entries.iter().map(|(letter, _)| *letter).collect()
    }

    /// Letters of one class, in table order
    pub fn letters_of(&self, class: ModeClass) -> String {
        self.entries
            .iter()
            .filter(|(_, candidate)| *candidate == class)
            .map(|(letter, _)| *letter)
            .collect()
    }
}

/// Personal modes
pub static USER_MODES: ModeGrammar = ModeGrammar {
    entries: &[
        ('i', ModeClass::Boolean),
        ('o', ModeClass::Boolean),
        // WHOIS lists only channels shared with the viewer
        ('p', ModeClass::Boolean),
        ('w', ModeClass::Boolean),
        ('x', ModeClass::Boolean),
        // Bot, flagged in WHO
        ('B', ModeClass::Boolean),
        // Operator status hidden from non-operators
        ('H', ModeClass::Boolean),
    ],
};

/// Channel modes
pub static CHANNEL_MODES: ModeGrammar = ModeGrammar {
    entries: &[
        ('q', ModeClass::PrivilegeRank),
        ('a', ModeClass::PrivilegeRank),
        ('o', ModeClass::PrivilegeRank),
        ('h', ModeClass::PrivilegeRank),
        ('v', ModeClass::PrivilegeRank),
        ('b', ModeClass::ListEntry),
        ('e', ModeClass::ListEntry),
        ('I', ModeClass::ListEntry),
        ('k', ModeClass::ParameterAlways),
        ('l', ModeClass::ParameterOnSet),
        ('c', ModeClass::Boolean),
        ('i', ModeClass::Boolean),
        ('m', ModeClass::Boolean),
        ('n', ModeClass::Boolean),
        ('p', ModeClass::Boolean),
        ('r', ModeClass::Boolean),
        ('s', ModeClass::Boolean),
        ('t', ModeClass::Boolean),
        ('C', ModeClass::Boolean),
        ('M', ModeClass::Boolean),
        ('N', ModeClass::Boolean),
        ('Q', ModeClass::Boolean),
        ('R', ModeClass::Boolean),
        ('T', ModeClass::Boolean),
    ],
};

/// ISUPPORT `CHANMODES` value derived from the channel table
pub fn chanmodes_token() -> String {
    format!(
        "{},{},{},{}",
        CHANNEL_MODES.letters_of(ModeClass::ListEntry),
        CHANNEL_MODES.letters_of(ModeClass::ParameterAlways),
        CHANNEL_MODES.letters_of(ModeClass::ParameterOnSet),
        CHANNEL_MODES.letters_of(ModeClass::Boolean),
    )
}

/// ISUPPORT `PREFIX` value
pub fn prefix_token() -> String {
    let letters: String = Rank::ALL.iter().map(|rank| rank.letter()).collect();
    let prefixes: String = Rank::ALL.iter().map(|rank| rank.prefix()).collect();
    format!("({}){}", letters, prefixes)
}
