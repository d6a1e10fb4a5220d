//! Channel-related state.

use std::collections::{BTreeSet, HashMap};

use crate::isupport::PrefixMap;

/// Channel topic with metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Topic {
    /// Topic text.
    pub text: String,
    /// Who set it, once 333 arrives.
    pub set_by: Option<String>,
    /// Unix timestamp of the change, once 333 arrives.
    pub set_at: Option<i64>,
}

/// A channel membership: one user's presence and status in a channel.
#[derive(Clone, Debug)]
pub struct ChannelUser {
    /// Nickname in its display form.
    pub nick: String,
    /// Status prefix symbols held in this channel. Deduplicated; rank
    /// order is imposed on read via the PREFIX table.
    statuses: Vec<char>,
}

impl ChannelUser {
    /// A membership with no status.
    pub fn new(nick: &str) -> Self {
        ChannelUser {
            nick: nick.to_string(),
            statuses: Vec::new(),
        }
    }

    /// Grant a status symbol.
    pub fn add_status(&mut self, symbol: char) {
        if !self.statuses.contains(&symbol) {
            self.statuses.push(symbol);
        }
    }

    /// Remove a status symbol.
    pub fn remove_status(&mut self, symbol: char) {
        self.statuses.retain(|&s| s != symbol);
    }

    /// Whether the member holds a status symbol.
    pub fn has_status(&self, symbol: char) -> bool {
        self.statuses.contains(&symbol)
    }

    /// All held status symbols, in no particular order. Use
    /// [`statuses_ranked`](Self::statuses_ranked) for privilege order.
    pub fn statuses(&self) -> impl Iterator<Item = char> + '_ {
        self.statuses.iter().copied()
    }

    /// Held status symbols ordered by PREFIX rank, highest privilege
    /// first; symbols the table does not know come last.
    pub fn statuses_ranked(&self, prefix: &PrefixMap) -> Vec<char> {
        let mut ranked = self.statuses.clone();
        ranked.sort_by_key(|&s| prefix.rank_of_symbol(s).unwrap_or(usize::MAX));
        ranked
    }

    /// The ordinal of the member's highest status per the PREFIX table;
    /// 0 is highest. Symbols the table does not know rank below every
    /// known one. `None` for a plain member.
    pub fn highest_status_rank(&self, prefix: &PrefixMap) -> Option<usize> {
        self.statuses
            .iter()
            .map(|&s| prefix.rank_of_symbol(s).unwrap_or(usize::MAX))
            .min()
    }

    /// The member's highest status symbol, if any.
    pub fn highest_status(&self, prefix: &PrefixMap) -> Option<char> {
        self.statuses_ranked(prefix).first().copied()
    }
}

/// A channel the local user is in.
#[derive(Clone, Debug)]
pub struct Channel {
    /// Channel name in its display form.
    pub name: String,
    /// Topic, once known.
    pub topic: Option<Topic>,
    /// Channel creation time (329), once known.
    pub created_at: Option<i64>,
    /// Active type D flag modes.
    pub flags: BTreeSet<char>,
    /// Current values of type B/C parameterized modes.
    pub mode_params: HashMap<char, String>,
    /// Accumulated type A list-mode masks, keyed by mode character.
    pub lists: HashMap<char, BTreeSet<String>>,
    /// Memberships, keyed by fold of the nickname.
    pub members: HashMap<String, ChannelUser>,
}

impl Channel {
    /// A freshly joined channel.
    pub fn new(name: &str) -> Self {
        Channel {
            name: name.to_string(),
            topic: None,
            created_at: None,
            flags: BTreeSet::new(),
            mode_params: HashMap::new(),
            lists: HashMap::new(),
            members: HashMap::new(),
        }
    }
}
