//! Online-presence subscriptions.
//!
//! MONITOR and WATCH are two competing wire protocols for the same
//! idea; this module abstracts them into one fold-keyed nickname set
//! with set algebra, and produces batched wire lines under both the
//! advertised target cap and the authoritative 510-byte line cap.

use std::collections::HashMap;

use crate::casemap::CaseMapping;
use crate::error::SessionError;
use crate::util::MAX_BODY_LEN;

/// Which wire protocol the network offers for presence subscriptions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresenceProtocol {
    /// The IRCv3 MONITOR command.
    Monitor,
    /// The legacy WATCH command.
    Watch,
}

/// The set of nicknames whose online presence is subscribed.
#[derive(Clone, Debug, Default)]
pub struct MonitorList {
    casemap: CaseMapping,
    entries: HashMap<String, String>,
}

impl MonitorList {
    /// An empty list under the default mapping.
    pub fn new() -> Self {
        MonitorList::default()
    }

    /// Re-key the set after a case-mapping change.
    pub fn set_casemapping(&mut self, mapping: CaseMapping) {
        if mapping == self.casemap {
            return;
        }
        self.casemap = mapping;
        let old = std::mem::take(&mut self.entries);
        for (_, display) in old {
            self.entries.insert(mapping.fold(&display), display);
        }
    }

    /// Add a nickname. Returns `false` if it was already present.
    pub fn insert(&mut self, nick: &str) -> bool {
        self.entries
            .insert(self.casemap.fold(nick), nick.to_string())
            .is_none()
    }

    /// Remove a nickname. Returns `false` if it was absent.
    pub fn remove(&mut self, nick: &str) -> bool {
        self.entries.remove(&self.casemap.fold(nick)).is_some()
    }

    /// Whether a nickname is subscribed.
    pub fn contains(&self, nick: &str) -> bool {
        self.entries.contains_key(&self.casemap.fold(nick))
    }

    /// Drop every subscription.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of subscriptions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Subscribed nicknames in display form.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(String::as_str)
    }

    /// Nicknames present in either set.
    pub fn union(&self, other: &MonitorList) -> Vec<String> {
        let mut out: Vec<String> = self.entries.values().cloned().collect();
        for display in other.entries.values() {
            if !self.contains(display) {
                out.push(display.clone());
            }
        }
        out
    }

    /// Nicknames present in both sets.
    pub fn intersection(&self, other: &MonitorList) -> Vec<String> {
        self.entries
            .values()
            .filter(|display| other.contains(display))
            .cloned()
            .collect()
    }

    /// Nicknames in this set but not the other.
    pub fn difference(&self, other: &MonitorList) -> Vec<String> {
        self.entries
            .values()
            .filter(|display| !other.contains(display))
            .cloned()
            .collect()
    }

    /// Nicknames in exactly one of the sets.
    pub fn symmetric_difference(&self, other: &MonitorList) -> Vec<String> {
        let mut out = self.difference(other);
        out.extend(other.difference(self));
        out
    }

    /// Whether every nickname here is also in the other set.
    pub fn is_subset(&self, other: &MonitorList) -> bool {
        self.entries.values().all(|display| other.contains(display))
    }

    /// Whether both sets subscribe the same nicknames.
    pub fn set_eq(&self, other: &MonitorList) -> bool {
        self.len() == other.len() && self.is_subset(other)
    }
}

/// Reject nicknames that cannot appear in a presence command.
pub fn validate_nick(nick: &str) -> Result<(), SessionError> {
    if nick.is_empty() || nick.contains([' ', ',', '\r', '\n']) {
        return Err(SessionError::InvalidArgument(format!(
            "invalid nickname for presence list: {:?}",
            nick
        )));
    }
    Ok(())
}

/// Batch nicknames into `MONITOR +`/`MONITOR -` or `WATCH` lines.
///
/// `target_cap` is the advertised per-command target count; it is
/// advisory, while the 510-byte line cap is authoritative. `add`
/// selects addition or removal.
pub fn batch_commands(
    protocol: PresenceProtocol,
    nicks: &[String],
    target_cap: Option<u32>,
    add: bool,
) -> Vec<String> {
    let sign = if add { '+' } else { '-' };
    let mut lines = Vec::new();
    let mut batch: Vec<&str> = Vec::new();
    let mut batch_len = 0usize;

    let base_len = match protocol {
        // "MONITOR + " / "MONITOR - "
        PresenceProtocol::Monitor => 10,
        // "WATCH "
        PresenceProtocol::Watch => 6,
    };
    // Per-nick separator/sign overhead on the wire
    let per_nick_overhead = match protocol {
        PresenceProtocol::Monitor => 1, // ','
        PresenceProtocol::Watch => 2,   // " +"
    };

    let flush = |batch: &mut Vec<&str>, lines: &mut Vec<String>| {
        if batch.is_empty() {
            return;
        }
        let line = match protocol {
            PresenceProtocol::Monitor => {
                format!("MONITOR {} {}", sign, batch.join(","))
            }
            PresenceProtocol::Watch => {
                let targets: Vec<String> =
                    batch.iter().map(|n| format!("{}{}", sign, n)).collect();
                format!("WATCH {}", targets.join(" "))
            }
        };
        lines.push(line);
        batch.clear();
    };

    for nick in nicks {
        let added_len = nick.len() + per_nick_overhead;
        let cap_hit = target_cap.is_some_and(|cap| batch.len() >= cap as usize);
        let len_hit = base_len + batch_len + added_len > MAX_BODY_LEN;
        if (cap_hit || len_hit) && !batch.is_empty() {
            flush(&mut batch, &mut lines);
            batch_len = 0;
        }
        batch_len += nick.len() + per_nick_overhead;
        batch.push(nick);
    }
    flush(&mut batch, &mut lines);
    lines
}
