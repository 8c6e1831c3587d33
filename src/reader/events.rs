//! XML event types.
//!
//! Events are the atomic parsing notifications of the pull pipeline,
//! produced in strict document order. A self-closing tag is reported as a
//! `Start` immediately followed by an `End` for the same name, so consumers
//! never special-case empty elements.

use indexmap::IndexMap;

/// One parsing notification.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlEvent {
    /// Start of an element, with attributes in source order.
    Start {
        name: String,
        attributes: IndexMap<String, String>,
    },
    /// End of an element.
    End { name: String },
    /// Text content between tags, whitespace preserved verbatim.
    Text { content: String },
}

impl XmlEvent {
    /// Check if this is a start event.
    #[inline]
    pub fn is_start(&self) -> bool {
        matches!(self, XmlEvent::Start { .. })
    }

    /// Check if this is an end event.
    #[inline]
    pub fn is_end(&self) -> bool {
        matches!(self, XmlEvent::End { .. })
    }

    /// Check if this is a text event.
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self, XmlEvent::Text { .. })
    }

    /// Element name, for start and end events.
    pub fn name(&self) -> Option<&str> {
        match self {
            XmlEvent::Start { name, .. } | XmlEvent::End { name } => Some(name),
            XmlEvent::Text { .. } => None,
        }
    }

    /// Text content, for text events.
    pub fn text(&self) -> Option<&str> {
        match self {
            XmlEvent::Text { content } => Some(content),
            _ => None,
        }
    }
}

/// An event paired with its 1-based sequence number as seen by a consumer.
///
/// Sequence numbers count yielded events only: they increase by exactly 1
/// per record, are never reused, and are unaffected by how many events were
/// suppressed by depth truncation.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub sequence: u64,
    pub event: XmlEvent,
}
