//! SASL authentication helpers.
//!
//! Only the PLAIN mechanism (RFC 4616) is implemented; credentials are
//! encoded as base64 of `authzid NUL authcid NUL password` and split
//! into 400-byte AUTHENTICATE chunks, with `+` standing for an empty
//! payload.
//!
//! # Reference
//! - IRCv3 SASL: <https://ircv3.net/specs/extensions/sasl-3.2>
//! - RFC 4616 (PLAIN): <https://tools.ietf.org/html/rfc4616>

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// Maximum length of a single SASL message chunk.
///
/// Responses that exceed this length must be split into multiple
/// AUTHENTICATE commands, with a final `+` if the payload length is an
/// exact multiple of the chunk size.
pub const SASL_CHUNK_SIZE: usize = 400;

/// Encode credentials for the PLAIN mechanism.
///
/// The authorization identity is left empty, which servers interpret
/// as "authorize as the authenticated user".
pub fn encode_plain(account: &str, password: &str) -> String {
    encode_plain_with_authzid("", account, password)
}

/// Encode PLAIN credentials with an explicit authorization identity.
pub fn encode_plain_with_authzid(authzid: &str, authcid: &str, password: &str) -> String {
    let payload = format!("{}\0{}\0{}", authzid, authcid, password);
    BASE64.encode(payload.as_bytes())
}

/// Split an encoded SASL response into AUTHENTICATE payload chunks.
///
/// An empty response yields a single `+`. When the response length is
/// an exact multiple of [`SASL_CHUNK_SIZE`] a trailing `+` marks the
/// end of the payload.
pub fn chunk_response(encoded: &str) -> Vec<String> {
    if encoded.is_empty() {
        return vec!["+".to_string()];
    }

    let mut chunks: Vec<String> = encoded
        .as_bytes()
        .chunks(SASL_CHUNK_SIZE)
        // base64 output is always ASCII
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect();

    if encoded.len() % SASL_CHUNK_SIZE == 0 {
        chunks.push("+".to_string());
    }
    chunks
}

/// Decode a base64-encoded SASL challenge. `+` decodes to empty.
pub fn decode_challenge(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    if encoded == "+" {
        return Ok(Vec::new());
    }
    BASE64.decode(encoded)
}
