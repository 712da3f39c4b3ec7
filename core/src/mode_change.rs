//! Mode change engine
//!
//! Walks a change string such as `+ov-b alice bob *!*@spam` left to right,
//! hands each occurrence to a [`ModeTarget`] and keeps the effective
//! mutations. Occurrences that undo an earlier effective mutation within the
//! same call cancel it, so the resulting [`ModeChange`] only describes the net
//! difference and is empty when nothing changed.

use crate::modes::{ModeClass, ModeGrammar};
use std::fmt;

/// Why an occurrence was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Letter not in the grammar table
    UnknownMode,
    /// No parameter left for a letter that needs one
    MissingParameter,
    /// Caller lacks the rank to change this letter
    Forbidden,
    /// Parameter present but unusable (e.g. a non-numeric limit)
    BadParameter,
}

/// Result of a single occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeOutcome {
    /// State changed; carries the resolved parameter, if the letter takes one
    Applied(Option<String>),
    /// State already matched the request
    NoOp,
    /// Occurrence refused
    Invalid(Rejection),
}

/// One occurrence handed to a target
#[derive(Debug, Clone, Copy)]
pub struct ModeRequest<'a> {
    pub adding: bool,
    pub letter: char,
    pub class: ModeClass,
    pub param: Option<&'a str>,
}

/// Anything whose modes can be changed by the engine
pub trait ModeTarget {
    /// Attempt one occurrence
    fn apply_mode(&mut self, request: &ModeRequest<'_>) -> ModeOutcome;

    /// Current value of a value letter (`k`, `l`), if one is held
    fn value(&self, _letter: char) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ModeEntry {
    adding: bool,
    letter: char,
    param: Option<String>,
    key: Option<String>,
}

/// Net effect of one change string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeChange {
    entries: Vec<ModeEntry>,
}

impl ModeChange {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `+adds-removes` without parameters
    pub fn letters(&self) -> String {
        let added: String = self.entries.iter().filter(|e| e.adding).map(|e| e.letter).collect();
        let removed: String = self.entries.iter().filter(|e| !e.adding).map(|e| e.letter).collect();

        let mut out = String::new();
        if !added.is_empty() {
            out.push('+');
            out.push_str(&added);
        }
        if !removed.is_empty() {
            out.push('-');
            out.push_str(&removed);
        }
        out
    }

    /// Parameters of the effective occurrences, in consumption order
    pub fn params(&self) -> Vec<String> {
        self.entries.iter().filter_map(|e| e.param.clone()).collect()
    }

    /// Letter string followed by parameters, ready to append to a MODE line
    pub fn to_params(&self) -> Vec<String> {
        let mut out = vec![self.letters()];
        out.extend(self.params());
        out
    }
}

impl fmt::Display for ModeChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_params().join(" "))
    }
}

/// Everything the engine learned while applying a change string
#[derive(Debug, Clone, Default)]
pub struct ModeReport {
    pub change: ModeChange,
    /// Parameters taken from the front of the parameter list
    pub consumed: usize,
    /// Refused occurrences in input order
    pub rejected: Vec<(char, Rejection)>,
}

impl ModeReport {
    pub fn rejected_with(&self, rejection: Rejection) -> impl Iterator<Item = char> + '_ {
        self.rejected
            .iter()
            .filter(move |(_, r)| *r == rejection)
            .map(|(letter, _)| *letter)
    }
}

fn is_value_class(class: ModeClass) -> bool {
    matches!(class, ModeClass::ParameterAlways | ModeClass::ParameterOnSet)
}

/// Apply `changes` with positional `params` to `target`
pub fn apply_mode_string<T: ModeTarget + ?Sized>(
    grammar: &ModeGrammar,
    target: &mut T,
    changes: &str,
    params: &[String],
) -> ModeReport {
    let mut report = ModeReport::default();
    let mut entries: Vec<ModeEntry> = Vec::new();
    // Value of each value letter before this call first touched it
    let mut originals: Vec<(char, Option<String>)> = Vec::new();
    let mut remaining = params.iter();
    let mut adding = true;

    for letter in changes.chars() {
        match letter {
            '+' => {
                adding = true;
                continue;
            }
            '-' => {
                adding = false;
                continue;
            }
            _ => {}
        }

        let Some(class) = grammar.classify(letter) else {
            report.rejected.push((letter, Rejection::UnknownMode));
            continue;
        };

        let param = if class.takes_parameter(adding) {
            match remaining.next() {
                Some(param) => {
                    report.consumed += 1;
                    Some(param.as_str())
                }
                None => {
                    report.rejected.push((letter, Rejection::MissingParameter));
                    continue;
                }
            }
        } else {
            None
        };

        let value_letter = is_value_class(class);
        if value_letter && !originals.iter().any(|(l, _)| *l == letter) {
            originals.push((letter, target.value(letter)));
        }

        let request = ModeRequest {
            adding,
            letter,
            class,
            param,
        };

        let resolved = match target.apply_mode(&request) {
            ModeOutcome::Applied(resolved) => resolved,
            ModeOutcome::NoOp => continue,
            ModeOutcome::Invalid(rejection) => {
                report.rejected.push((letter, rejection));
                continue;
            }
        };

        let key = match class {
            ModeClass::ListEntry | ModeClass::PrivilegeRank => {
                resolved.as_ref().map(|p| p.to_ascii_lowercase())
            }
            _ => None,
        };

        let previous = entries
            .iter()
            .position(|e| e.letter == letter && e.key == key)
            .map(|pos| entries.remove(pos));

        if value_letter {
            // Only the final value matters; back at the original means no change
            let original = originals
                .iter()
                .find(|(l, _)| *l == letter)
                .and_then(|(_, value)| value.clone());
            if target.value(letter) == original {
                continue;
            }
        } else if previous.is_some() {
            // A flag or entry flipped back within the same call
            continue;
        }

        entries.push(ModeEntry {
            adding,
            letter,
            param: resolved,
            key,
        });
    }

    report.change = ModeChange { entries };
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::{CHANNEL_MODES, USER_MODES};
    use std::collections::BTreeSet;

    #[derive(Default)]
    struct Flags {
        set: BTreeSet<char>,
        limit: Option<usize>,
        bans: Vec<String>,
    }

    impl ModeTarget for Flags {
        fn apply_mode(&mut self, request: &ModeRequest<'_>) -> ModeOutcome {
            match (request.class, request.param) {
                (ModeClass::Boolean, _) => {
                    let changed = if request.adding {
                        self.set.insert(request.letter)
                    } else {
                        self.set.remove(&request.letter)
                    };
                    if changed {
                        ModeOutcome::Applied(None)
                    } else {
                        ModeOutcome::NoOp
                    }
                }
                (ModeClass::ParameterOnSet, Some(raw)) => match raw.parse::<usize>() {
                    Ok(limit) if self.limit == Some(limit) => ModeOutcome::NoOp,
                    Ok(limit) => {
                        self.limit = Some(limit);
                        ModeOutcome::Applied(Some(limit.to_string()))
                    }
                    Err(_) => ModeOutcome::Invalid(Rejection::BadParameter),
                },
                (ModeClass::ParameterOnSet, None) => match self.limit.take() {
                    Some(_) => ModeOutcome::Applied(None),
                    None => ModeOutcome::NoOp,
                },
                (ModeClass::ListEntry, Some(mask)) => {
                    let present = self.bans.iter().position(|b| b == mask);
                    match (request.adding, present) {
                        (true, None) => {
                            self.bans.push(mask.to_string());
                            ModeOutcome::Applied(Some(mask.to_string()))
                        }
                        (false, Some(pos)) => {
                            self.bans.remove(pos);
                            ModeOutcome::Applied(Some(mask.to_string()))
                        }
                        _ => ModeOutcome::NoOp,
                    }
                }
                _ => ModeOutcome::Invalid(Rejection::Forbidden),
            }
        }

        fn value(&self, letter: char) -> Option<String> {
            match letter {
                'l' => self.limit.map(|limit| limit.to_string()),
                _ => None,
            }
        }
    }

    fn apply(target: &mut Flags, changes: &str, params: &[&str]) -> ModeReport {
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        apply_mode_string(&CHANNEL_MODES, target, changes, &params)
    }

    #[test]
    fn test_setting_a_set_flag_is_empty() {
        let mut target = Flags::default();
        target.set.insert('n');

        let report = apply(&mut target, "+n", &[]);
        assert!(report.change.is_empty());
        assert_eq!(report.change.to_string(), "");
        assert_eq!(target.set.len(), 1);
    }

    #[test]
    fn test_add_then_remove_cancels() {
        let mut target = Flags::default();
        let report = apply(&mut target, "+m-m", &[]);
        assert!(report.change.is_empty());
        assert!(target.set.is_empty());

        target.set.insert('t');
        let report = apply(&mut target, "-t+n+t", &[]);
        assert_eq!(report.change.to_string(), "+n");
        assert!(target.set.contains(&'t'));
    }

    #[test]
    fn test_list_entries_cancel_per_mask() {
        let mut target = Flags::default();
        let report = apply(&mut target, "+bb-b", &["a!*@*", "b!*@*", "a!*@*"]);
        assert_eq!(report.change.to_string(), "+b b!*@*");
        assert_eq!(report.consumed, 3);
        assert_eq!(target.bans, vec!["b!*@*"]);
    }

    #[test]
    fn test_parameter_accounting_and_order() {
        let mut target = Flags::default();
        let report = apply(&mut target, "+nlb-l+x", &["abc", "*!*@bad", "extra"]);

        // `l` consumed "abc" and failed, `b` consumed the mask, `-l` takes nothing
        assert_eq!(report.consumed, 2);
        assert_eq!(report.change.to_string(), "+nb *!*@bad");
        assert_eq!(
            report.rejected,
            vec![('l', Rejection::BadParameter), ('x', Rejection::UnknownMode)]
        );
    }

    #[test]
    fn test_missing_parameter_skips_only_that_letter() {
        let mut target = Flags::default();
        let report = apply(&mut target, "+bn", &[]);
        assert_eq!(report.consumed, 0);
        assert_eq!(report.change.to_string(), "+n");
        assert_eq!(report.rejected, vec![('b', Rejection::MissingParameter)]);
    }

    #[test]
    fn test_value_set_and_clear_in_one_call_cancels() {
        let mut target = Flags::default();
        let report = apply(&mut target, "+l-l", &["10"]);
        assert!(report.change.is_empty());
        assert_eq!(target.limit, None);

        target.limit = Some(5);
        let report = apply(&mut target, "+l-l", &["10"]);
        assert_eq!(report.change.to_string(), "-l");
    }

    #[test]
    fn test_value_cleared_and_restored_cancels() {
        let mut target = Flags::default();
        target.limit = Some(5);
        let report = apply(&mut target, "-l+l", &["5"]);
        assert!(report.change.is_empty());
        assert_eq!(target.limit, Some(5));

        let report = apply(&mut target, "-l+l", &["7"]);
        assert_eq!(report.change.to_string(), "+l 7");
        assert_eq!(target.limit, Some(7));
    }

    #[test]
    fn test_mixed_output_format() {
        let mut target = Flags::default();
        target.set.insert('i');
        let report = apply(&mut target, "+nt-i", &[]);
        assert_eq!(report.change.to_string(), "+nt-i");
        assert_eq!(report.change.to_params(), vec!["+nt-i"]);
    }

    #[test]
    fn test_user_grammar_rejects_channel_letters() {
        let mut target = Flags::default();
        let report = apply_mode_string(&USER_MODES, &mut target, "+ib", &[]);
        assert_eq!(report.change.to_string(), "+i");
        assert_eq!(report.rejected, vec![('b', Rejection::UnknownMode)]);
    }
}
