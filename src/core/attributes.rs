//! XML attribute parsing.
//!
//! Parses the attribute region of a start tag into an ordered mapping.
//! Source order is preserved; duplicate names are rejected. Values must be
//! quoted (single or double) and have their entity references decoded.

use indexmap::IndexMap;
use memchr::memchr;

use super::entities::decode_text;

/// Parsing failure at `offset` bytes into the attribute slice. The caller
/// translates the offset into an absolute stream position.
#[derive(Debug)]
pub struct AttrError {
    pub offset: usize,
    pub reason: String,
}

impl AttrError {
    fn new(offset: usize, reason: impl Into<String>) -> Self {
        AttrError {
            offset,
            reason: reason.into(),
        }
    }
}

/// Parse attributes from the tag interior after the element name.
pub fn parse_attributes(input: &[u8]) -> Result<IndexMap<String, String>, AttrError> {
    let mut attrs = IndexMap::new();
    let mut pos = 0;

    loop {
        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }
        if pos >= input.len() {
            break;
        }

        // Attribute name
        let name_start = pos;
        if !is_name_start_char(input[pos]) {
            return Err(AttrError::new(pos, "malformed attribute name"));
        }
        while pos < input.len() && is_name_char(input[pos]) {
            pos += 1;
        }
        let name = std::str::from_utf8(&input[name_start..pos])
            .map_err(|_| AttrError::new(name_start, "attribute name is not valid UTF-8"))?
            .to_string();

        // Whitespace around '=' is insignificant
        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }
        if pos >= input.len() || input[pos] != b'=' {
            return Err(AttrError::new(
                pos.min(input.len()),
                format!("expected `=` after attribute name `{name}`"),
            ));
        }
        pos += 1;
        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }

        // Quoted value
        if pos >= input.len() {
            return Err(AttrError::new(
                input.len(),
                format!("missing value for attribute `{name}`"),
            ));
        }
        let quote = input[pos];
        if quote != b'"' && quote != b'\'' {
            return Err(AttrError::new(
                pos,
                format!("value of attribute `{name}` must be quoted"),
            ));
        }
        pos += 1;
        let value_start = pos;
        let value_end = match memchr(quote, &input[pos..]) {
            Some(i) => pos + i,
            None => {
                return Err(AttrError::new(
                    value_start,
                    format!("unterminated value for attribute `{name}`"),
                ))
            }
        };

        let decoded = decode_text(&input[value_start..value_end]).map_err(|e| {
            AttrError::new(value_start + e.offset, e.reason)
        })?;
        let value = String::from_utf8(decoded.into_owned())
            .map_err(|_| AttrError::new(value_start, "attribute value is not valid UTF-8"))?;

        if attrs.contains_key(&name) {
            return Err(AttrError::new(
                name_start,
                format!("duplicate attribute `{name}`"),
            ));
        }
        attrs.insert(name, value);
        pos = value_end + 1;
    }

    Ok(attrs)
}

/// Check if byte is valid XML name start character.
/// Allows ASCII letters, underscore, colon, and non-ASCII (UTF-8 Unicode).
#[inline]
fn is_name_start_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

/// Check if byte is valid XML name character.
#[inline]
fn is_name_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'.' | b':') || b >= 0x80
}

#[inline]
fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_attributes() {
        let attrs = parse_attributes(b" id=\"test\" class=\"foo\"").unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.get("id").map(String::as_str), Some("test"));
        assert_eq!(attrs.get("class").map(String::as_str), Some("foo"));
    }

    #[test]
    fn test_source_order_preserved() {
        let attrs = parse_attributes(b" z=\"1\" a=\"2\" m=\"3\"").unwrap();
        let keys: Vec<_> = attrs.keys().map(String::as_str).collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn test_single_quoted() {
        let attrs = parse_attributes(b" id='test'").unwrap();
        assert_eq!(attrs.get("id").map(String::as_str), Some("test"));
    }

    #[test]
    fn test_whitespace_around_equals() {
        let attrs = parse_attributes(b"  id  =  \"test\"  ").unwrap();
        assert_eq!(attrs.get("id").map(String::as_str), Some("test"));
    }

    #[test]
    fn test_entity_in_value() {
        let attrs = parse_attributes(b" title=\"&lt;hello&gt;\"").unwrap();
        assert_eq!(attrs.get("title").map(String::as_str), Some("<hello>"));
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_attributes(b"").unwrap().is_empty());
        assert!(parse_attributes(b"   ").unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_rejected() {
        let err = parse_attributes(b" id=\"1\" id=\"2\"").unwrap_err();
        assert!(err.reason.contains("duplicate attribute `id`"));
        assert_eq!(err.offset, 9);
    }

    #[test]
    fn test_unquoted_value_rejected() {
        let err = parse_attributes(b" id=test").unwrap_err();
        assert!(err.reason.contains("must be quoted"));
    }

    #[test]
    fn test_missing_equals_rejected() {
        let err = parse_attributes(b" checked disabled").unwrap_err();
        assert!(err.reason.contains("expected `=`"));
    }

    #[test]
    fn test_unterminated_value_rejected() {
        let err = parse_attributes(b" id=\"oops").unwrap_err();
        assert!(err.reason.contains("unterminated"));
    }

    #[test]
    fn test_bad_entity_in_value_rejected() {
        let err = parse_attributes(b" t=\"&nope;\"").unwrap_err();
        assert!(err.reason.contains("unknown entity"));
    }
}
