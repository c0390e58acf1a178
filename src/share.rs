//! Shareable-link roster encoding.
//!
//! The roster travels in a `players` query parameter as a percent-encoded
//! JSON array of names. Decoding is lenient about the rest of the query
//! string; encoding always produces a single `players=` pair that the host
//! splices into the page URL (replacing history, not pushing).

use tracing::warn;

/// Name of the query parameter carrying the roster.
pub const PLAYERS_PARAM: &str = "players";

/// Errors from share-link decoding.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ShareError {
    /// The parameter value was not valid percent-encoding.
    #[display("malformed percent-encoding in share link")]
    BadEncoding,
    /// The decoded payload was not a JSON array of strings.
    #[display("share link payload is not a JSON array of names: {_0}")]
    BadPayload(String),
    /// The host clipboard refused the share URL.
    ///
    /// Copying is the host's job; this case exists so hosts can surface
    /// the failure through the same error channel as the rest of the
    /// share flow.
    #[display("could not copy the share link to the clipboard")]
    ClipboardUnavailable,
}

impl std::error::Error for ShareError {}

/// Encodes a name list as the full `players=` query-string pair.
pub fn encode_players(names: &[String]) -> String {
    let json = serde_json::to_string(names).expect("string array always serializes");
    format!("{PLAYERS_PARAM}={}", percent_encode(&json))
}

/// Decodes the roster from a raw query string (without the leading `?`).
///
/// An absent or empty parameter yields an empty list, matching a fresh
/// board. A malformed payload is an error so the caller can decide to warn
/// and continue empty.
pub fn decode_players(query: &str) -> Result<Vec<String>, ShareError> {
    let Some(raw) = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == PLAYERS_PARAM)
        .map(|(_, value)| value)
    else {
        return Ok(Vec::new());
    };
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let json = percent_decode(raw).ok_or(ShareError::BadEncoding)?;
    serde_json::from_str(&json).map_err(|err| {
        warn!(%err, "share link payload rejected");
        ShareError::BadPayload(err.to_string())
    })
}

/// Percent-encodes with `encodeURIComponent`'s unreserved set
/// (`A-Z a-z 0-9 - _ . ! ~ * ' ( )`).
fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Reverses [`percent_encode`]. Returns `None` on truncated or non-hex
/// escapes or invalid UTF-8.
fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = bytes.get(i + 1..i + 3)?;
                let hex = std::str::from_utf8(hex).ok()?;
                out.push(u8::from_str_radix(hex, 16).ok()?);
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn roster_round_trips_through_the_query_string() {
        let original = names(&["Aoi", "Ken", "translate me"]);
        let query = encode_players(&original);
        assert!(query.starts_with("players=%5B%22"));
        assert_eq!(decode_players(&query).unwrap(), original);
    }

    #[test]
    fn non_ascii_names_survive() {
        let original = names(&["青井", "ケン"]);
        let query = encode_players(&original);
        assert_eq!(decode_players(&query).unwrap(), original);
    }

    #[test]
    fn missing_parameter_means_empty_roster() {
        assert_eq!(decode_players("").unwrap(), Vec::<String>::new());
        assert_eq!(decode_players("foo=bar").unwrap(), Vec::<String>::new());
        assert_eq!(decode_players("players=").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn other_parameters_are_ignored() {
        let query = format!("theme=dark&{}&x=1", encode_players(&names(&["Aoi"])));
        assert_eq!(decode_players(&query).unwrap(), names(&["Aoi"]));
    }

    #[test]
    fn malformed_payloads_are_errors_not_panics() {
        assert!(matches!(
            decode_players("players=%7Bnot-json"),
            Err(ShareError::BadPayload(_))
        ));
        assert!(matches!(
            decode_players("players=%ZZ"),
            Err(ShareError::BadEncoding)
        ));
    }

    #[test]
    fn encoding_matches_encode_uri_component() {
        assert_eq!(percent_encode("[\"Aoi\"]"), "%5B%22Aoi%22%5D");
        assert_eq!(percent_encode("a-b_c.d!e~f*g'h(i)"), "a-b_c.d!e~f*g'h(i)");
        assert_eq!(percent_encode("a b"), "a%20b");
    }
}
