mod parse;
mod serialize;
mod types;

pub use self::types::{Message, Tag};

/// IRCv3 tag-value escape table: wire escape character paired with the
/// literal it stands for. The parser and serializer walk it in opposite
/// directions.
const TAG_VALUE_ESCAPES: [(char, char); 5] = [
    (':', ';'),
    ('s', ' '),
    ('\\', '\\'),
    ('r', '\r'),
    ('n', '\n'),
];
