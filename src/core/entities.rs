//! XML entity decoding.
//!
//! Handles the five predefined entities (`&lt; &gt; &amp; &quot; &apos;`)
//! and decimal/hexadecimal character references (`&#123; &#x7B;`). Any
//! other named entity is malformed input: this crate performs no DTD
//! processing, so there is nothing that could declare one.
//!
//! Uses Cow for zero-copy when no entities are present.

use std::borrow::Cow;

use memchr::memchr;

/// Decoding failure at `offset` bytes into the input slice. The caller
/// translates the offset into an absolute stream position.
#[derive(Debug)]
pub struct EntityError {
    pub offset: usize,
    pub reason: String,
}

/// Decode entity and character references in a text or attribute-value run.
///
/// Returns Borrowed if no references are present (zero-copy).
pub fn decode_text(input: &[u8]) -> Result<Cow<'_, [u8]>, EntityError> {
    // Fast path: no ampersand, nothing to do.
    if memchr(b'&', input).is_none() {
        return Ok(Cow::Borrowed(input));
    }

    let mut out = Vec::with_capacity(input.len());
    let mut pos = 0;
    while pos < input.len() {
        match memchr(b'&', &input[pos..]) {
            Some(i) => {
                out.extend_from_slice(&input[pos..pos + i]);
                let amp = pos + i;
                let semi = match memchr(b';', &input[amp..]) {
                    Some(j) => amp + j,
                    None => {
                        return Err(EntityError {
                            offset: amp,
                            reason: "unterminated entity reference".to_string(),
                        })
                    }
                };
                let decoded = decode_entity(&input[amp + 1..semi]).map_err(|reason| {
                    EntityError {
                        offset: amp,
                        reason,
                    }
                })?;
                let mut utf8 = [0u8; 4];
                out.extend_from_slice(decoded.encode_utf8(&mut utf8).as_bytes());
                pos = semi + 1;
            }
            None => {
                out.extend_from_slice(&input[pos..]);
                break;
            }
        }
    }
    Ok(Cow::Owned(out))
}

/// Decode a single reference (the part between `&` and `;`).
fn decode_entity(name: &[u8]) -> Result<char, String> {
    match name {
        b"lt" => Ok('<'),
        b"gt" => Ok('>'),
        b"amp" => Ok('&'),
        b"quot" => Ok('"'),
        b"apos" => Ok('\''),
        [b'#', digits @ ..] => decode_char_ref(digits),
        _ => Err(format!(
            "unknown entity `&{};`",
            String::from_utf8_lossy(name)
        )),
    }
}

/// Decode a numeric character reference: decimal `&#65;` or hex `&#x41;`.
fn decode_char_ref(digits: &[u8]) -> Result<char, String> {
    let codepoint = match digits {
        [] => return Err("empty character reference".to_string()),
        [b'x' | b'X', hex @ ..] if !hex.is_empty() => std::str::from_utf8(hex)
            .ok()
            .and_then(|s| u32::from_str_radix(s, 16).ok()),
        [b'x' | b'X'] => None,
        dec => std::str::from_utf8(dec).ok().and_then(|s| s.parse().ok()),
    };
    let codepoint =
        codepoint.ok_or_else(|| "invalid digits in character reference".to_string())?;
    if !is_valid_xml_char(codepoint) {
        return Err(format!(
            "character reference U+{codepoint:04X} is not a valid XML character"
        ));
    }
    char::from_u32(codepoint)
        .ok_or_else(|| "invalid digits in character reference".to_string())
}

/// Check if a code point is a valid XML 1.0 Char.
/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}
