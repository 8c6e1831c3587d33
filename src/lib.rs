//! xmliter - Streaming, memory-bounded XML ingestion
//!
//! A lazy event source over large XML documents, plus two consumers built
//! on it:
//!
//! - [`iter_xml`]: pull [`EventRecord`]s one at a time. Cost is
//!   proportional to the number of events pulled, never to document size.
//! - [`xml_to_dict`]: reduce the stream to a nested mapping following the
//!   xmltodict conventions (`@`-prefixed attributes, `#text`, scalar-to-list
//!   promotion, empty leaf is null).
//! - [`get_edge_counts`]: tally occurrences per root-to-element tag path,
//!   optionally capped for fast approximate counts.
//!
//! [`ParseLimits`] bounds work independently of input size: `max_events`
//! truncates the stream cleanly and `max_depth` prunes subtrees while
//! keeping the yielded stream balanced. Limits are not errors.
//!
//! Input is UTF-8 by default; UTF-16 (either byte order) is detected and
//! transcoded on the fly. Documents declaring any other encoding fail with
//! [`Error::UnsupportedEncoding`]. Malformed input never panics: every
//! well-formed event before the failure point is yielded, then the error
//! surfaces on the next pull.
//!
//! ```
//! use xmliter::{iter_xml_str, xml_to_dict_str, ParseLimits, Value};
//!
//! let doc = "<root><item>1</item><item>2</item></root>";
//!
//! for record in iter_xml_str(doc, ParseLimits::none()) {
//!     let record = record.unwrap();
//!     println!("{} {:?}", record.sequence, record.event);
//! }
//!
//! let dict = xml_to_dict_str(doc, None, None).unwrap();
//! let items = dict.get("root").and_then(|r| r.get("item")).unwrap();
//! assert_eq!(items.as_list().map(<[Value]>::len), Some(2));
//! ```

mod collect;
mod core;
mod error;
mod reader;
mod value;

pub use crate::collect::edges::{EdgeCountTable, PathKey};
pub use crate::core::encoding::{DecodingReader, XmlEncoding};
pub use crate::error::{Error, Position, Result};
pub use crate::reader::bounded::{EventIter, ParseLimits};
pub use crate::reader::events::{EventRecord, XmlEvent};
pub use crate::value::Value;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::reader::stream::EventReader;

/// Iterate XML events from a file, with limits applied.
pub fn iter_xml<P: AsRef<Path>>(
    path: P,
    limits: ParseLimits,
) -> Result<EventIter<DecodingReader<File>>> {
    let file = File::open(path)?;
    Ok(iter_xml_reader(file, limits))
}

/// Iterate XML events from any byte source, with limits applied.
pub fn iter_xml_reader<R: Read>(reader: R, limits: ParseLimits) -> EventIter<DecodingReader<R>> {
    EventIter::new(EventReader::new(DecodingReader::new(reader)), limits)
}

/// Iterate XML events from an in-memory document, with limits applied.
pub fn iter_xml_str(input: &str, limits: ParseLimits) -> EventIter<DecodingReader<&[u8]>> {
    iter_xml_reader(input.as_bytes(), limits)
}

/// Convert an XML file to its nested mapping form.
///
/// All-or-nothing over errors; `max_depth`/`max_events` truncation is not
/// an error and yields a smaller mapping. An input truncated to nothing
/// reduces to [`Value::Null`].
pub fn xml_to_dict<P: AsRef<Path>>(
    path: P,
    max_depth: Option<usize>,
    max_events: Option<u64>,
) -> Result<Value> {
    let file = File::open(path)?;
    xml_to_dict_reader(file, max_depth, max_events)
}

/// Convert XML from any byte source to its nested mapping form.
pub fn xml_to_dict_reader<R: Read>(
    reader: R,
    max_depth: Option<usize>,
    max_events: Option<u64>,
) -> Result<Value> {
    let limits = ParseLimits::new(max_depth, max_events);
    collect::dict::events_to_dict(iter_xml_reader(reader, limits))
}

/// Convert an in-memory XML document to its nested mapping form.
pub fn xml_to_dict_str(
    input: &str,
    max_depth: Option<usize>,
    max_events: Option<u64>,
) -> Result<Value> {
    xml_to_dict_reader(input.as_bytes(), max_depth, max_events)
}

/// Count element occurrences per structural path in an XML file.
///
/// `n_max` caps how many start events are examined; the table built so far
/// is returned once the cap is reached.
pub fn get_edge_counts<P: AsRef<Path>>(path: P, n_max: Option<u64>) -> Result<EdgeCountTable> {
    let file = File::open(path)?;
    get_edge_counts_reader(file, n_max)
}

/// Count element occurrences per structural path from any byte source.
pub fn get_edge_counts_reader<R: Read>(reader: R, n_max: Option<u64>) -> Result<EdgeCountTable> {
    collect::edges::count_edges(iter_xml_reader(reader, ParseLimits::none()), n_max)
}

/// Count element occurrences per structural path in an in-memory document.
pub fn get_edge_counts_str(input: &str, n_max: Option<u64>) -> Result<EdgeCountTable> {
    get_edge_counts_reader(input.as_bytes(), n_max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, content: &[u8]) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("xmliter-test-{}-{name}", std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_iter_xml_from_file() {
        let path = temp_file("iter.xml", b"<root><item>1</item></root>");
        let records: Vec<_> = iter_xml(&path, ParseLimits::none())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(records.len(), 5);
        assert_eq!(records[0].sequence, 1);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = iter_xml("/no/such/file.xml", ParseLimits::none()).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_xml_to_dict_from_file() {
        let path = temp_file("dict.xml", b"<a id=\"1\"/>");
        let dict = xml_to_dict(&path, None, None).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(
            dict.get("a").and_then(|a| a.get("@id")),
            Some(&Value::from("1"))
        );
    }

    #[test]
    fn test_edge_counts_from_file() {
        let path = temp_file("edges.xml", b"<r><x/><x/></r>");
        let counts = get_edge_counts(&path, None).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(
            counts.get(&vec!["r".to_string(), "x".to_string()]),
            Some(&2)
        );
    }

    #[test]
    fn test_utf16_file_parses_like_utf8() {
        let doc = "<r><t>caf\u{e9} \u{4e16}\u{754c}</t></r>";
        let mut utf16 = vec![0xFF, 0xFE];
        for unit in doc.encode_utf16() {
            utf16.extend_from_slice(&unit.to_le_bytes());
        }

        let from_utf8 = xml_to_dict_str(doc, None, None).unwrap();
        let from_utf16 = xml_to_dict_reader(&utf16[..], None, None).unwrap();
        assert_eq!(from_utf8, from_utf16);
    }

    #[test]
    fn test_two_consumers_need_two_passes() {
        let doc = "<r><x>1</x></r>";
        // Each call constructs an independent scanner over the source.
        let dict = xml_to_dict_str(doc, None, None).unwrap();
        let counts = get_edge_counts_str(doc, None).unwrap();
        assert!(!dict.is_null());
        assert_eq!(counts.values().sum::<u64>(), 2);
    }
}
