//! Streaming XML tokenizer.
//!
//! Pulls raw tokens off a [`BufSource`]: start/end/empty tags (with parsed
//! attributes), text runs (entities decoded), and CDATA content. Comments,
//! processing instructions, and DOCTYPE declarations are consumed and
//! discarded; the XML declaration is inspected only for its `encoding`
//! pseudo-attribute. Nothing is pulled from the underlying source beyond
//! the token currently being decoded.

use std::io::Read;

use indexmap::IndexMap;
use log::debug;

use super::attributes;
use super::encoding;
use super::entities;
use super::source::BufSource;
use crate::error::{Error, Position, Result};

/// One lexical item pulled off the byte stream.
#[derive(Debug)]
pub enum Token {
    /// `<name a="1">` or `<name a="1"/>`
    StartTag {
        name: String,
        attributes: IndexMap<String, String>,
        self_closing: bool,
    },
    /// `</name>`
    EndTag { name: String },
    /// Text run (entities decoded) or CDATA content (verbatim).
    Text { content: String },
    /// End of input.
    Eof,
}

#[derive(Debug)]
pub struct Tokenizer<R: Read> {
    src: BufSource<R>,
}

impl<R: Read> Tokenizer<R> {
    pub fn new(reader: R) -> Self {
        Tokenizer {
            src: BufSource::new(reader),
        }
    }

    /// Position of the next unconsumed byte.
    pub fn position(&self) -> Position {
        self.src.position()
    }

    /// Pull the next token. After an error the source is left mid-token;
    /// callers are expected to stop pulling.
    pub fn next_token(&mut self) -> Result<Token> {
        loop {
            let Some(byte) = self.src.peek()? else {
                return Ok(Token::Eof);
            };
            if byte != b'<' {
                return self.read_text();
            }
            match self.src.peek_at(1)? {
                Some(b'/') => return self.read_end_tag(),
                Some(b'!') => {
                    if let Some(token) = self.read_bang()? {
                        return Ok(token);
                    }
                }
                Some(b'?') => self.read_pi()?,
                Some(_) => return self.read_start_tag(),
                None => {
                    return Err(self.malformed_here("unexpected end of input after `<`"));
                }
            }
        }
    }

    fn malformed_here(&self, reason: impl Into<String>) -> Error {
        Error::malformed(self.src.position(), reason)
    }

    fn read_start_tag(&mut self) -> Result<Token> {
        let start_pos = self.src.position();
        let close = match self.src.find_tag_end(1)? {
            Some(i) => i,
            None => return Err(Error::malformed(start_pos, "unclosed tag at end of input")),
        };
        let self_closing = close > 1 && self.src.slice(close - 1, close) == b"/";
        let interior_end = if self_closing { close - 1 } else { close };

        // Everything below borrows the window, so errors are reported as
        // (offset-into-tag, reason) and resolved to positions afterwards.
        let parsed = {
            let interior = self.src.slice(1, interior_end);
            let name_len = name_length(interior);
            if name_len == 0 {
                Err((1usize, "invalid element name".to_string()))
            } else {
                match std::str::from_utf8(&interior[..name_len]) {
                    Err(_) => Err((1, "element name is not valid UTF-8".to_string())),
                    Ok(name) => match attributes::parse_attributes(&interior[name_len..]) {
                        Ok(attrs) => Ok((name.to_string(), attrs)),
                        Err(e) => Err((1 + name_len + e.offset, e.reason)),
                    },
                }
            }
        };

        match parsed {
            Ok((name, attributes)) => {
                self.src.consume(close + 1);
                Ok(Token::StartTag {
                    name,
                    attributes,
                    self_closing,
                })
            }
            Err((offset, reason)) => {
                self.src.consume(offset);
                Err(self.malformed_here(reason))
            }
        }
    }

    fn read_end_tag(&mut self) -> Result<Token> {
        let start_pos = self.src.position();
        let close = match self.src.find_byte(b'>', 2)? {
            Some(i) => i,
            None => {
                return Err(Error::malformed(
                    start_pos,
                    "unclosed end tag at end of input",
                ))
            }
        };

        let parsed = {
            let interior = self.src.slice(2, close);
            let name_len = name_length(interior);
            let rest_ok = interior[name_len..].iter().all(|&b| is_whitespace(b));
            if name_len == 0 || !rest_ok {
                Err("malformed end tag")
            } else {
                match std::str::from_utf8(&interior[..name_len]) {
                    Ok(name) => Ok(name.to_string()),
                    Err(_) => Err("element name is not valid UTF-8"),
                }
            }
        };

        match parsed {
            Ok(name) => {
                self.src.consume(close + 1);
                Ok(Token::EndTag { name })
            }
            Err(reason) => Err(Error::malformed(start_pos, reason)),
        }
    }

    /// Markup starting `<!`: comment, CDATA section, or DOCTYPE.
    /// Returns None when the construct produced no token.
    fn read_bang(&mut self) -> Result<Option<Token>> {
        if self.src.starts_with(b"<!--")? {
            let end = match self.src.find_seq(b"-->", 4)? {
                Some(i) => i,
                None => return Err(self.malformed_here("unterminated comment")),
            };
            self.src.consume(end + 3);
            Ok(None)
        } else if self.src.starts_with(b"<![CDATA[")? {
            let end = match self.src.find_seq(b"]]>", 9)? {
                Some(i) => i,
                None => return Err(self.malformed_here("unterminated CDATA section")),
            };
            let content = match String::from_utf8(self.src.slice(9, end).to_vec()) {
                Ok(c) => c,
                Err(_) => {
                    return Err(self.malformed_here("CDATA content is not valid UTF-8"));
                }
            };
            self.src.consume(end + 3);
            if content.is_empty() {
                Ok(None)
            } else {
                Ok(Some(Token::Text { content }))
            }
        } else if self.src.starts_with(b"<!DOCTYPE")? {
            self.skip_doctype()?;
            Ok(None)
        } else {
            Err(self.malformed_here("invalid markup declaration"))
        }
    }

    /// Skip `<!DOCTYPE ...>`, honoring quoted literals and an `[...]`
    /// internal subset. The subset itself is never interpreted.
    fn skip_doctype(&mut self) -> Result<()> {
        let start_pos = self.src.position();
        let mut at = 9usize;
        let mut bracket_depth = 0i32;
        let mut quote: Option<u8> = None;
        loop {
            if self.src.ensure(at + 1)? <= at {
                return Err(Error::malformed(
                    start_pos,
                    "unterminated DOCTYPE declaration",
                ));
            }
            let b = self.src.slice(at, at + 1)[0];
            match quote {
                Some(q) => {
                    if b == q {
                        quote = None;
                    }
                }
                None => match b {
                    b'"' | b'\'' => quote = Some(b),
                    b'[' => bracket_depth += 1,
                    b']' => bracket_depth -= 1,
                    b'>' if bracket_depth <= 0 => {
                        self.src.consume(at + 1);
                        return Ok(());
                    }
                    _ => {}
                },
            }
            at += 1;
        }
    }

    /// Skip a processing instruction. The XML declaration is a PI as far as
    /// tokenization goes; its `encoding` pseudo-attribute is validated here.
    fn read_pi(&mut self) -> Result<()> {
        let end = match self.src.find_seq(b"?>", 2)? {
            Some(i) => i,
            None => {
                return Err(self.malformed_here("unterminated processing instruction"));
            }
        };

        let declared = {
            let interior = self.src.slice(2, end);
            let is_decl = interior.len() >= 3
                && interior[..3].eq_ignore_ascii_case(b"xml")
                && (interior.len() == 3 || is_whitespace(interior[3]));
            if is_decl {
                // A declaration that does not even parse is inert.
                match attributes::parse_attributes(&interior[3..]) {
                    Ok(attrs) => attrs.get("encoding").cloned(),
                    Err(_) => None,
                }
            } else {
                None
            }
        };

        if let Some(label) = declared {
            if !encoding::is_supported_label(&label) {
                return Err(Error::UnsupportedEncoding { declared: label });
            }
            debug!("XML declaration names encoding {label}");
        }

        self.src.consume(end + 2);
        Ok(())
    }

    fn read_text(&mut self) -> Result<Token> {
        let end = match self.src.find_byte(b'<', 0)? {
            Some(i) => i,
            None => self.src.len(),
        };

        let decoded = {
            let raw = self.src.slice(0, end);
            entities::decode_text(raw).map(|cow| cow.into_owned())
        };

        match decoded {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(content) => {
                    self.src.consume(end);
                    Ok(Token::Text { content })
                }
                Err(_) => Err(self.malformed_here("text content is not valid UTF-8")),
            },
            Err(e) => {
                self.src.consume(e.offset);
                Err(self.malformed_here(e.reason))
            }
        }
    }
}

/// Length of the XML name at the head of `input`, or 0 if it does not
/// start with a name start character.
fn name_length(input: &[u8]) -> usize {
    match input.first() {
        Some(&b) if is_name_start_char(b) => {}
        _ => return 0,
    }
    let mut len = 1;
    while len < input.len() && is_name_char(input[len]) {
        len += 1;
    }
    len
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
