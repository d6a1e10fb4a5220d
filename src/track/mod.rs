//! The in-memory model of the network as seen by this session.
//!
//! Every keyed container here is keyed by the case-fold of the
//! identifier under the active mapping. Memberships are bidirectional:
//! a user in a channel's member map always lists that channel in its
//! own channel set. The disappearance policy is enforced at every
//! removal site: a user with no shared channels that is neither
//! monitored nor the local user is dropped, and its display nick is
//! returned so the session can emit a vanished event.

mod channel;
mod user;

pub use self::channel::{Channel, ChannelUser, Topic};
pub use self::user::User;

use std::collections::HashMap;

use crate::casemap::CaseMapping;

/// User and channel tables.
#[derive(Clone, Debug, Default)]
pub struct Tracker {
    casemap: CaseMapping,
    users: HashMap<String, User>,
    channels: HashMap<String, Channel>,
}

impl Tracker {
    /// An empty tracker under the default (rfc1459) mapping.
    pub fn new() -> Self {
        Tracker::default()
    }

    /// The active case mapping.
    pub fn casemap(&self) -> CaseMapping {
        self.casemap
    }

    /// Fold an identifier under the active mapping.
    pub fn fold(&self, s: &str) -> String {
        self.casemap.fold(s)
    }

    /// Switch the case mapping, re-keying every container while
    /// preserving values.
    pub fn set_casemapping(&mut self, mapping: CaseMapping) {
        if mapping == self.casemap {
            return;
        }
        self.casemap = mapping;

        let old_users = std::mem::take(&mut self.users);
        let old_channels = std::mem::take(&mut self.channels);

        for (_, mut user) in old_users {
            user.channels.clear();
            let key = self.casemap.fold(&user.nick);
            self.users.insert(key, user);
        }

        for (_, mut chan) in old_channels {
            let chan_key = self.casemap.fold(&chan.name);
            let members = std::mem::take(&mut chan.members);
            for (_, member) in members {
                let nick_key = self.casemap.fold(&member.nick);
                if let Some(user) = self.users.get_mut(&nick_key) {
                    user.channels.insert(chan_key.clone());
                }
                chan.members.insert(nick_key, member);
            }
            self.channels.insert(chan_key, chan);
        }
    }

    /// Look up a user by nickname.
    pub fn user(&self, nick: &str) -> Option<&User> {
        self.users.get(&self.fold(nick))
    }

    /// Look up a user for mutation.
    pub fn user_mut(&mut self, nick: &str) -> Option<&mut User> {
        let key = self.fold(nick);
        self.users.get_mut(&key)
    }

    /// Look up a channel by name.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(&self.fold(name))
    }

    /// Look up a channel for mutation.
    pub fn channel_mut(&mut self, name: &str) -> Option<&mut Channel> {
        let key = self.fold(name);
        self.channels.get_mut(&key)
    }

    /// All known users.
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// All joined channels.
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    /// Get or create a user entry.
    pub fn ensure_user(&mut self, nick: &str) -> &mut User {
        let key = self.fold(nick);
        self.users.entry(key).or_insert_with(|| User::new(nick))
    }

    /// Create a channel on local JOIN. Replaces any stale entry.
    pub fn create_channel(&mut self, name: &str) {
        let key = self.fold(name);
        self.channels.insert(key, Channel::new(name));
    }

    /// Record a membership, creating the user if needed.
    pub fn add_member(&mut self, channel: &str, nick: &str) {
        let chan_key = self.fold(channel);
        let nick_key = self.fold(nick);
        let Some(chan) = self.channels.get_mut(&chan_key) else {
            return;
        };
        chan.members
            .entry(nick_key.clone())
            .or_insert_with(|| ChannelUser::new(nick));
        let user = self
            .users
            .entry(nick_key)
            .or_insert_with(|| User::new(nick));
        user.channels.insert(chan_key);
    }

    /// Remove one membership. Returns the display nick if the user
    /// disappeared as a result.
    pub fn remove_member(&mut self, channel: &str, nick: &str) -> Option<String> {
        let chan_key = self.fold(channel);
        let nick_key = self.fold(nick);
        if let Some(chan) = self.channels.get_mut(&chan_key) {
            chan.members.remove(&nick_key);
        }
        if let Some(user) = self.users.get_mut(&nick_key) {
            user.channels.remove(&chan_key);
        }
        self.purge_if_orphan(&nick_key)
    }

    /// Remove a user from every channel (QUIT). Returns the display
    /// nick if the user disappeared as a result.
    pub fn remove_user_everywhere(&mut self, nick: &str) -> Option<String> {
        let nick_key = self.fold(nick);
        let channel_keys: Vec<String> = match self.users.get(&nick_key) {
            Some(user) => user.channels.iter().cloned().collect(),
            None => return None,
        };
        for chan_key in &channel_keys {
            if let Some(chan) = self.channels.get_mut(chan_key) {
                chan.members.remove(&nick_key);
            }
        }
        if let Some(user) = self.users.get_mut(&nick_key) {
            user.channels.clear();
        }
        self.purge_if_orphan(&nick_key)
    }

    /// Drop a channel (local PART or KICK). Returns display nicks of
    /// every user that disappeared as a result.
    pub fn remove_channel(&mut self, name: &str) -> Vec<String> {
        let chan_key = self.fold(name);
        let Some(chan) = self.channels.remove(&chan_key) else {
            return Vec::new();
        };
        let mut vanished = Vec::new();
        for nick_key in chan.members.keys() {
            if let Some(user) = self.users.get_mut(nick_key) {
                user.channels.remove(&chan_key);
            }
            if let Some(nick) = self.purge_if_orphan(nick_key) {
                vanished.push(nick);
            }
        }
        vanished
    }

    /// Re-key a user after a NICK change, in the user table and every
    /// membership map. No entry is created for an unknown user.
    pub fn rename_user(&mut self, old: &str, new: &str) {
        let old_key = self.fold(old);
        let Some(mut user) = self.users.remove(&old_key) else {
            return;
        };
        user.nick = new.to_string();
        let new_key = self.fold(new);
        for chan_key in &user.channels {
            if let Some(chan) = self.channels.get_mut(chan_key) {
                if let Some(mut member) = chan.members.remove(&old_key) {
                    member.nick = new.to_string();
                    chan.members.insert(new_key.clone(), member);
                }
            }
        }
        self.users.insert(new_key, user);
    }

    /// Apply the disappearance policy to one user. Returns the display
    /// nick if the entry was dropped.
    pub fn purge_if_orphan(&mut self, nick_key: &str) -> Option<String> {
        let orphan = self
            .users
            .get(nick_key)
            .is_some_and(|user| !user.is_retained());
        if orphan {
            self.users.remove(nick_key).map(|user| user.nick)
        } else {
            None
        }
    }

    /// Disconnect cleanup: drop every channel and user. Returns display
    /// nicks of all users for vanished events.
    pub fn clear(&mut self) -> Vec<String> {
        self.channels.clear();
        self.users.drain().map(|(_, user)| user.nick).collect()
    }
}
