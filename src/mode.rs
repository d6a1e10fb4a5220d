//! Channel mode string parsing.
//!
//! Walks a MODE parameter list with a sign cursor (`+` assumed when
//! absent), consulting the active CHANMODES and PREFIX tables to decide
//! which mode characters consume a parameter and what the parameter
//! means.

use tracing::debug;

use crate::isupport::{ChanModeKind, Isupport};

/// One decoded mode change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModeChange {
    /// A status (PREFIX) mode granted to or removed from a member.
    Status {
        /// The mode character (`o`, `v`, ...).
        mode: char,
        /// The affected nickname.
        nick: String,
        /// Whether the status was granted.
        set: bool,
    },
    /// A type A list mode with its mask.
    List {
        /// The mode character (`b`, ...).
        mode: char,
        /// The list mask.
        mask: String,
        /// Whether the mask was added.
        set: bool,
    },
    /// A type B/C mode, with its argument when one was consumed.
    Param {
        /// The mode character (`k`, `l`, ...).
        mode: char,
        /// The argument, absent for a type C unset.
        arg: Option<String>,
        /// Whether the mode was set.
        set: bool,
    },
    /// A type D flag mode.
    Flag {
        /// The mode character.
        mode: char,
        /// Whether the flag was set.
        set: bool,
    },
}

/// Parse the mode parameters of a channel MODE message.
///
/// `params` is the parameter list after the channel name. Mode
/// characters whose required argument is missing are skipped; unknown
/// mode characters are treated as flags.
pub fn parse_channel_modes(params: &[String], isupport: &Isupport) -> Vec<ModeChange> {
    let mut changes = Vec::new();
    let Some((modes, args)) = params.split_first() else {
        return changes;
    };
    let mut args = args.iter();

    let mut set = true;
    for c in modes.chars() {
        match c {
            '+' => set = true,
            '-' => set = false,
            _ => {
                if isupport.prefix.is_status_mode(c) {
                    match args.next() {
                        Some(nick) => changes.push(ModeChange::Status {
                            mode: c,
                            nick: nick.clone(),
                            set,
                        }),
                        None => debug!(mode = %c, "status mode without nick argument"),
                    }
                    continue;
                }
                match isupport.chanmodes.kind_of(c) {
                    Some(ChanModeKind::List) => match args.next() {
                        Some(mask) => changes.push(ModeChange::List {
                            mode: c,
                            mask: mask.clone(),
                            set,
                        }),
                        None => debug!(mode = %c, "list mode without mask argument"),
                    },
                    Some(ChanModeKind::AlwaysParam) => match args.next() {
                        Some(arg) => changes.push(ModeChange::Param {
                            mode: c,
                            arg: Some(arg.clone()),
                            set,
                        }),
                        None => debug!(mode = %c, "parameterized mode without argument"),
                    },
                    Some(ChanModeKind::SetParam) => {
                        let arg = if set { args.next().cloned() } else { None };
                        if set && arg.is_none() {
                            debug!(mode = %c, "set-only parameterized mode without argument");
                        } else {
                            changes.push(ModeChange::Param { mode: c, arg, set });
                        }
                    }
                    Some(ChanModeKind::Flag) | None => {
                        changes.push(ModeChange::Flag { mode: c, set });
                    }
                }
            }
        }
    }

    changes
}
