//! Event reader: tokens to balanced events.
//!
//! Drives the tokenizer and enforces well-formedness: every end tag must
//! match the innermost open start tag, the document has exactly one root
//! element, and input ending with open elements is malformed. Self-closing
//! tags are expanded into a `Start`/`End` pair here.
//!
//! On malformed input every well-formed event up to the failure point has
//! already been yielded; the failing pull returns the error and subsequent
//! pulls return `None`.

use std::io::Read;

use log::trace;

use crate::core::tokenizer::{Token, Tokenizer};
use crate::error::{Error, Result};

use super::events::XmlEvent;

#[derive(Debug)]
pub struct EventReader<R: Read> {
    tokenizer: Tokenizer<R>,
    /// Stack of open tag names; mirrors the nesting depth exactly.
    open: Vec<String>,
    /// End half of a self-closing element, yielded on the next pull.
    pending_end: Option<String>,
    root_seen: bool,
    failed: bool,
}

impl<R: Read> EventReader<R> {
    pub fn new(reader: R) -> Self {
        EventReader {
            tokenizer: Tokenizer::new(reader),
            open: Vec::new(),
            pending_end: None,
            root_seen: false,
            failed: false,
        }
    }

    /// Pull the next event. `Ok(None)` is clean end of document; errors fuse
    /// the reader.
    pub fn next_event(&mut self) -> Result<Option<XmlEvent>> {
        if self.failed {
            return Ok(None);
        }

        if let Some(name) = self.pending_end.take() {
            self.open.pop();
            return Ok(Some(XmlEvent::End { name }));
        }

        loop {
            let token = match self.tokenizer.next_token() {
                Ok(token) => token,
                Err(e) => return self.fail(e),
            };

            match token {
                Token::Eof => {
                    if let Some(open) = self.open.last() {
                        let err = Error::malformed(
                            self.tokenizer.position(),
                            format!("unexpected end of input: `<{open}>` is not closed"),
                        );
                        return self.fail(err);
                    }
                    if !self.root_seen {
                        let err = Error::malformed(
                            self.tokenizer.position(),
                            "no root element found",
                        );
                        return self.fail(err);
                    }
                    return Ok(None);
                }

                Token::StartTag {
                    name,
                    attributes,
                    self_closing,
                } => {
                    if self.open.is_empty() && self.root_seen {
                        let err = Error::malformed(
                            self.tokenizer.position(),
                            "document contains more than one root element",
                        );
                        return self.fail(err);
                    }
                    self.root_seen = true;
                    self.open.push(name.clone());
                    if self_closing {
                        self.pending_end = Some(name.clone());
                    }
                    return Ok(Some(XmlEvent::Start { name, attributes }));
                }

                Token::EndTag { name } => match self.open.last() {
                    Some(top) if *top == name => {
                        self.open.pop();
                        return Ok(Some(XmlEvent::End { name }));
                    }
                    Some(top) => {
                        let err = Error::malformed(
                            self.tokenizer.position(),
                            format!("mismatched end tag: expected `</{top}>`, found `</{name}>`"),
                        );
                        return self.fail(err);
                    }
                    None => {
                        let err = Error::malformed(
                            self.tokenizer.position(),
                            format!("end tag `</{name}>` without matching start tag"),
                        );
                        return self.fail(err);
                    }
                },

                Token::Text { content } => {
                    if self.open.is_empty() {
                        // Only whitespace may appear outside the root.
                        if content.trim().is_empty() {
                            continue;
                        }
                        let err = Error::malformed(
                            self.tokenizer.position(),
                            "text content outside of the root element",
                        );
                        return self.fail(err);
                    }
                    return Ok(Some(XmlEvent::Text { content }));
                }
            }
        }
    }

    fn fail(&mut self, err: Error) -> Result<Option<XmlEvent>> {
        trace!("event reader failed: {err}");
        self.failed = true;
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn events(input: &str) -> Vec<XmlEvent> {
        let mut reader = EventReader::new(input.as_bytes());
        let mut out = Vec::new();
        while let Some(ev) = reader.next_event().unwrap() {
            out.push(ev);
        }
        out
    }

    fn collect_until_error(input: &str) -> (Vec<XmlEvent>, Error) {
        let mut reader = EventReader::new(input.as_bytes());
        let mut out = Vec::new();
        loop {
            match reader.next_event() {
                Ok(Some(ev)) => out.push(ev),
                Ok(None) => panic!("expected an error, stream ended cleanly"),
                Err(e) => return (out, e),
            }
        }
    }

    #[test]
    fn test_simple_element() {
        let evs = events("<root>hello</root>");
        assert_eq!(evs.len(), 3);
        assert_eq!(evs[0].name(), Some("root"));
        assert_eq!(evs[1].text(), Some("hello"));
        assert!(evs[2].is_end());
    }

    #[test]
    fn test_self_closing_expands_to_pair() {
        let evs = events("<root><br/></root>");
        assert_eq!(evs.len(), 4);
        assert!(evs[1].is_start() && evs[1].name() == Some("br"));
        assert!(evs[2].is_end() && evs[2].name() == Some("br"));
    }

    #[test]
    fn test_prolog_and_epilog_whitespace_ignored() {
        let evs = events("<?xml version=\"1.0\"?>\n  <r/>\n\n");
        assert_eq!(evs.len(), 2);
    }

    #[test]
    fn test_whitespace_inside_root_preserved() {
        let evs = events("<r>  <a/>  </r>");
        // Scanner preserves text verbatim; only the dict reducer trims.
        assert_eq!(evs.len(), 6);
        assert_eq!(evs[1].text(), Some("  "));
        assert_eq!(evs[4].text(), Some("  "));
    }

    #[test]
    fn test_mismatched_end_tag_yields_prior_events() {
        let (evs, err) = collect_until_error("<root><item>text</wrong></root>");
        assert_eq!(evs.len(), 3);
        assert_eq!(evs[2].text(), Some("text"));
        assert!(err.to_string().contains("mismatched end tag"));
    }

    #[test]
    fn test_unclosed_tag_at_eof() {
        let (evs, err) = collect_until_error("<root><unclosed>");
        assert_eq!(evs.len(), 2);
        assert!(err.to_string().contains("is not closed"));
    }

    #[test]
    fn test_reader_fuses_after_error() {
        let mut reader = EventReader::new(&b"<a></b>"[..]);
        assert!(reader.next_event().unwrap().is_some());
        assert!(reader.next_event().is_err());
        assert!(reader.next_event().unwrap().is_none());
    }

    #[test]
    fn test_second_root_rejected() {
        let (evs, err) = collect_until_error("<a/><b/>");
        assert_eq!(evs.len(), 2);
        assert!(err.to_string().contains("more than one root"));
    }

    #[test]
    fn test_text_outside_root_rejected() {
        let (_, err) = collect_until_error("<a/>trailing");
        assert!(err.to_string().contains("outside of the root"));
    }

    #[test]
    fn test_empty_input_rejected() {
        let mut reader = EventReader::new(&b"  \n "[..]);
        assert!(reader.next_event().is_err());
    }

    #[test]
    fn test_unicode_text_preserved() {
        let evs = events("<t>Hello \u{4e16}\u{754c} \u{1F30D} Caf\u{e9}</t>");
        assert_eq!(evs[1].text(), Some("Hello \u{4e16}\u{754c} \u{1F30D} Caf\u{e9}"));
    }

    #[test]
    fn test_deep_nesting() {
        let depth = 1000;
        let mut doc = String::new();
        for i in 0..depth {
            doc.push_str(&format!("<level{i}>"));
        }
        doc.push_str("<content>deep</content>");
        for i in (0..depth).rev() {
            doc.push_str(&format!("</level{i}>"));
        }

        let evs = events(&doc);
        let starts = evs.iter().filter(|e| e.is_start()).count();
        let ends = evs.iter().filter(|e| e.is_end()).count();
        assert_eq!(starts, depth + 1);
        assert_eq!(ends, depth + 1);
    }

    #[test]
    fn test_matches_quick_xml_event_stream() {
        use quick_xml::events::Event as QEvent;

        let doc = "<catalog><book id=\"1\"><title>XML &amp; more</title><empty/></book>\
                   <book id=\"2\"><title>Second</title></book></catalog>";

        let mut reference = Vec::new();
        let mut qr = quick_xml::Reader::from_str(doc);
        loop {
            match qr.read_event().unwrap() {
                QEvent::Start(e) => reference.push((
                    "start",
                    String::from_utf8(e.name().as_ref().to_vec()).unwrap(),
                )),
                QEvent::End(e) => reference.push((
                    "end",
                    String::from_utf8(e.name().as_ref().to_vec()).unwrap(),
                )),
                QEvent::Empty(e) => {
                    let name = String::from_utf8(e.name().as_ref().to_vec()).unwrap();
                    reference.push(("start", name.clone()));
                    reference.push(("end", name));
                }
                QEvent::Text(e) => {
                    reference.push(("text", e.unescape().unwrap().into_owned()));
                }
                QEvent::Eof => break,
                _ => {}
            }
        }

        let ours: Vec<(&str, String)> = events(doc)
            .into_iter()
            .map(|ev| match ev {
                XmlEvent::Start { name, .. } => ("start", name),
                XmlEvent::End { name } => ("end", name),
                XmlEvent::Text { content } => ("text", content),
            })
            .collect();

        assert_eq!(ours, reference);
    }
}
