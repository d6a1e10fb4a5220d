//! ISUPPORT (numeric 005) registry.
//!
//! Servers advertise their dialect through `RPL_ISUPPORT` tokens. The
//! registry decodes the tokens the session core consumes into typed
//! fields and retains everything else verbatim for introspection.
//!
//! # Reference
//! - <https://modern.ircdocs.horse/#rplisupport-005>

use crate::casemap::CaseMapping;

/// The `PREFIX=(modes)symbols` status table.
///
/// Position `i` in the mode list ranks status `i`; index 0 is the
/// highest status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrefixMap {
    modes: Vec<char>,
    symbols: Vec<char>,
}

impl PrefixMap {
    /// Parse a `PREFIX` value like `(ohv)@%+`.
    ///
    /// Mode and symbol lists must be parenthesized and of equal length.
    pub fn parse(value: &str) -> Option<Self> {
        let open = value.find('(')?;
        let close = value.find(')')?;
        if close < open {
            return None;
        }
        let modes: Vec<char> = value[open + 1..close].chars().collect();
        let symbols: Vec<char> = value[close + 1..].chars().collect();
        if modes.is_empty() || modes.len() != symbols.len() {
            return None;
        }
        Some(PrefixMap { modes, symbols })
    }

    /// Rank of a status symbol (`@` etc.); 0 is highest. Unknown
    /// symbols are not ranked.
    pub fn rank_of_symbol(&self, symbol: char) -> Option<usize> {
        self.symbols.iter().position(|&s| s == symbol)
    }

    /// Rank of a status mode character (`o` etc.); 0 is highest.
    pub fn rank_of_mode(&self, mode: char) -> Option<usize> {
        self.modes.iter().position(|&m| m == mode)
    }

    /// The status symbol a mode character grants.
    pub fn symbol_for_mode(&self, mode: char) -> Option<char> {
        self.rank_of_mode(mode).map(|i| self.symbols[i])
    }

    /// Whether a mode character is a status mode.
    pub fn is_status_mode(&self, mode: char) -> bool {
        self.modes.contains(&mode)
    }

    /// Whether a character is a known status symbol.
    pub fn is_symbol(&self, c: char) -> bool {
        self.symbols.contains(&c)
    }

    /// Status symbols in rank order.
    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }
}

impl Default for PrefixMap {
    fn default() -> Self {
        PrefixMap {
            modes: vec!['o', 'v'],
            symbols: vec!['@', '+'],
        }
    }
}

/// Classification of a channel mode character per `CHANMODES`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChanModeKind {
    /// Type A: list modes (bans etc.); always take a mask parameter.
    List,
    /// Type B: always take a parameter.
    AlwaysParam,
    /// Type C: take a parameter only when set.
    SetParam,
    /// Type D: flag modes, never take a parameter.
    Flag,
}

/// The four comma-separated `CHANMODES` groups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChanModes {
    /// Type A list modes.
    pub list: Vec<char>,
    /// Type B parameterized modes.
    pub always_param: Vec<char>,
    /// Type C on-set-only parameterized modes.
    pub set_param: Vec<char>,
    /// Type D flag modes.
    pub flag: Vec<char>,
}

impl ChanModes {
    /// Parse a `CHANMODES` value like `b,k,l,imnpst`.
    pub fn parse(value: &str) -> Option<Self> {
        let mut groups = value.splitn(4, ',');
        let list = groups.next()?.chars().collect();
        let always_param = groups.next()?.chars().collect();
        let set_param = groups.next()?.chars().collect();
        let flag = groups.next()?.chars().collect();
        Some(ChanModes {
            list,
            always_param,
            set_param,
            flag,
        })
    }

    /// Classify a mode character. Unknown characters are unclassified.
    pub fn kind_of(&self, mode: char) -> Option<ChanModeKind> {
        if self.list.contains(&mode) {
            Some(ChanModeKind::List)
        } else if self.always_param.contains(&mode) {
            Some(ChanModeKind::AlwaysParam)
        } else if self.set_param.contains(&mode) {
            Some(ChanModeKind::SetParam)
        } else if self.flag.contains(&mode) {
            Some(ChanModeKind::Flag)
        } else {
            None
        }
    }
}

impl Default for ChanModes {
    fn default() -> Self {
        // RFC 1459 baseline
        ChanModes {
            list: vec!['b'],
            always_param: vec!['k'],
            set_param: vec!['l'],
            flag: "imnpst".chars().collect(),
        }
    }
}

/// Typed view of the server-advertised parameters.
#[derive(Clone, Debug, Default)]
pub struct Isupport {
    /// Status prefix table.
    pub prefix: PrefixMap,
    /// Channel mode classification table.
    pub chanmodes: ChanModes,
    /// Valid channel-prefix characters.
    pub chantypes: Option<String>,
    /// Active case mapping.
    pub casemapping: CaseMapping,
    /// Network display name.
    pub network: Option<String>,
    /// Prefixes accepted for status-targeted messages.
    pub statusmsg: Option<String>,
    /// MONITOR support: `Some(None)` means advertised without a target
    /// cap, `Some(Some(n))` caps the list at `n` targets.
    pub monitor: Option<Option<u32>>,
    /// WATCH support, same shape as `monitor`.
    pub watch: Option<Option<u32>>,
    /// NAMESX advertised (multi-prefix equivalent without the cap).
    pub namesx: bool,
    /// UHNAMES advertised (userhost-in-names equivalent).
    pub uhnames: bool,
    raw: Vec<(String, Option<String>)>,
}

impl Isupport {
    /// Ingest the parameters of one 005 line.
    ///
    /// The first parameter (the client's nick) and a final trailing
    /// text parameter are skipped. Returns `true` if the case mapping
    /// changed, in which case every fold-keyed container must re-key.
    pub fn apply_params(&mut self, params: &[String]) -> bool {
        let mut tokens: &[String] = match params {
            [] => return false,
            [_, rest @ ..] => rest,
        };
        if let Some(last) = tokens.last() {
            if last.contains(' ') {
                tokens = &tokens[..tokens.len() - 1];
            }
        }

        let mut casemap_changed = false;
        for token in tokens {
            casemap_changed |= self.apply_token(token);
        }
        casemap_changed
    }

    fn apply_token(&mut self, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }
        if let Some(key) = token.strip_prefix('-') {
            self.remove(key);
            return false;
        }

        let (key, value) = match token.split_once('=') {
            Some((k, v)) => (k, Some(unescape_value(v))),
            None => (token, None),
        };

        self.raw.retain(|(k, _)| !k.eq_ignore_ascii_case(key));
        self.raw.push((key.to_string(), value.clone()));

        let value = value.as_deref();
        match key.to_ascii_uppercase().as_str() {
            "PREFIX" => {
                if let Some(map) = value.and_then(PrefixMap::parse) {
                    self.prefix = map;
                }
            }
            "CHANMODES" => {
                if let Some(modes) = value.and_then(ChanModes::parse) {
                    self.chanmodes = modes;
                }
            }
            "CHANTYPES" => {
                self.chantypes = value.map(str::to_string);
            }
            "CASEMAPPING" => {
                if let Some(mapping) = value.and_then(CaseMapping::parse) {
                    if mapping != self.casemapping {
                        self.casemapping = mapping;
                        return true;
                    }
                }
            }
            "NETWORK" => {
                self.network = value.map(str::to_string);
            }
            "STATUSMSG" => {
                self.statusmsg = value.map(str::to_string);
            }
            "MONITOR" => {
                self.monitor = Some(value.and_then(|v| v.parse().ok()));
            }
            "WATCH" => {
                self.watch = Some(value.and_then(|v| v.parse().ok()));
            }
            "NAMESX" => {
                self.namesx = true;
            }
            "UHNAMES" => {
                self.uhnames = true;
            }
            _ => {}
        }
        false
    }

    fn remove(&mut self, key: &str) {
        self.raw.retain(|(k, _)| !k.eq_ignore_ascii_case(key));
        match key.to_ascii_uppercase().as_str() {
            "PREFIX" => self.prefix = PrefixMap::default(),
            "CHANMODES" => self.chanmodes = ChanModes::default(),
            "CHANTYPES" => self.chantypes = None,
            "NETWORK" => self.network = None,
            "STATUSMSG" => self.statusmsg = None,
            "MONITOR" => self.monitor = None,
            "WATCH" => self.watch = None,
            "NAMESX" => self.namesx = false,
            "UHNAMES" => self.uhnames = false,
            _ => {}
        }
    }

    /// Look up a retained token by key. The outer `Option` is presence,
    /// the inner the token's value.
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.raw
            .iter()
            .rfind(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_deref())
    }

    /// Whether a channel name starts with an advertised channel type.
    pub fn is_channel_name(&self, name: &str) -> bool {
        let types = self.chantypes.as_deref().unwrap_or("#&");
        name.chars().next().is_some_and(|c| types.contains(c))
    }
}

/// Decode `\xHH` escapes in an ISUPPORT value.
fn unescape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && bytes.get(i + 1) == Some(&b'x') {
            if let Some(hex) = value.get(i + 2..i + 4) {
                if let Ok(code) = u8::from_str_radix(hex, 16) {
                    out.push(code as char);
                    i += 4;
                    continue;
                }
            }
        }
        // Advance one whole character, not one byte
        let ch_len = value[i..]
            .chars()
            .next()
            .map(char::len_utf8)
            .unwrap_or(1);
        out.push_str(&value[i..i + ch_len]);
        i += ch_len;
    }
    out
}
