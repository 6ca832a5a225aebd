//! Canonical JSON encoding of signed requests.
//!
//! Devices sign the JSON encoding their firmware toolchain produces: struct
//! fields in declaration order, no whitespace, and the HTML-sensitive
//! characters `<`, `>`, `&` plus U+2028 and U+2029 written as `\uXXXX`
//! escapes. `serde_json` matches everything except the escapes, which the
//! formatter below adds.

use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;

use crate::error::CryptoError;

#[derive(Debug, Default, Clone, Copy)]
struct EscapingFormatter;

impl Formatter for EscapingFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            let escape = match c {
                '<' => "\\u003c",
                '>' => "\\u003e",
                '&' => "\\u0026",
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };
            writer.write_all(&fragment.as_bytes()[start..i])?;
            writer.write_all(escape.as_bytes())?;
            start = i + c.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }
}

/// Serialize `value` to its canonical byte form.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CryptoError> {
    let mut out = Vec::with_capacity(128);
    let mut ser = serde_json::Serializer::with_formatter(&mut out, EscapingFormatter);
    value.serialize(&mut ser)?;
    Ok(out)
}
