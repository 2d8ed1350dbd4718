//! # Query Decoder
//!
//! Turns a raw query string into a map of decoded keys to decoded values.
//! Never fails: pairs that cannot be decoded are dropped.

use std::collections::HashMap;

/// Parse a raw query string (`?a=1&b=2` or `a=1&b=2`) into a map
///
/// Duplicate keys keep the last value. Pairs without `=`, with an empty key,
/// or whose percent-escapes do not decode to UTF-8 are treated as absent.
#[must_use]
pub fn parse_query(raw: &str) -> HashMap<String, String> {
    let raw = raw.strip_prefix('?').unwrap_or(raw);

    raw.split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = url_decode(key)?;
            if key.is_empty() {
                return None;
            }
            Some((key, url_decode(value)?))
        })
        .collect()
}

/// Form-style URL decoding (`+` is a space)
///
/// Returns `None` if the decoded bytes are not UTF-8. A `%` that does not
/// start a valid escape is kept literally.
fn url_decode(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' => {
                let escaped = bytes
                    .get(i + 1..i + 3)
                    .filter(|hex| hex.iter().all(u8::is_ascii_hexdigit))
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                if let Some(byte) = escaped {
                    out.push(byte);
                    i += 2;
                } else {
                    out.push(b'%');
                }
            }
            b => out.push(b),
        }
        i += 1;
    }

    String::from_utf8(out).ok()
}
