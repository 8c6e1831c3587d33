//! Dict reducer: fold an event stream into a nested mapping.
//!
//! Reproduces the xmltodict shaping rules as plain data-structure
//! operations over ordered maps, maintained on an explicit frame stack so
//! memory is bounded by nesting depth, not document size:
//!
//! - attributes are recorded under `@`-prefixed keys, in source order;
//! - accumulated text is trimmed once at element end and stored under
//!   `#text` only when the element also has attributes or children;
//! - a repeated sibling tag promotes the existing scalar to a list on its
//!   second occurrence and appends afterwards;
//! - an element with nothing at all reduces to null.
//!
//! Conversion is all-or-nothing over errors. Truncation by limits is not an
//! error: frames still open when a truncated stream ends are folded up as
//! if closed at the truncation point.

use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::error::Result;
use crate::reader::events::{EventRecord, XmlEvent};
use crate::value::Value;

const ATTR_PREFIX: &str = "@";
const TEXT_KEY: &str = "#text";

/// Accumulator for one open element.
struct Frame {
    tag: String,
    attributes: IndexMap<String, String>,
    text: String,
    children: IndexMap<String, Value>,
}

impl Frame {
    fn new(tag: String, attributes: IndexMap<String, String>) -> Self {
        Frame {
            tag,
            attributes,
            text: String::new(),
            children: IndexMap::new(),
        }
    }

    /// Synthetic frame below the document root; only its children are used.
    fn document() -> Self {
        Frame::new(String::new(), IndexMap::new())
    }

    /// Compute this element's value.
    fn into_value(self) -> (String, Value) {
        let text = self.text.trim();
        let value = if self.attributes.is_empty() && self.children.is_empty() {
            if text.is_empty() {
                Value::Null
            } else {
                Value::Text(text.to_string())
            }
        } else {
            let mut map =
                IndexMap::with_capacity(self.attributes.len() + self.children.len() + 1);
            for (name, value) in self.attributes {
                map.insert(format!("{ATTR_PREFIX}{name}"), Value::Text(value));
            }
            map.extend(self.children);
            if !text.is_empty() {
                map.insert(TEXT_KEY.to_string(), Value::Text(text.to_string()));
            }
            Value::Map(map)
        };
        (self.tag, value)
    }

    /// Merge a finished child into this frame, promoting to a list on the
    /// second occurrence of the same tag.
    fn merge_child(&mut self, tag: String, value: Value) {
        match self.children.entry(tag) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                Value::List(items) => items.push(value),
                existing => {
                    let previous = std::mem::take(existing);
                    *existing = Value::List(vec![previous, value]);
                }
            },
        }
    }
}

/// Frame-stack reducer over [`XmlEvent`]s.
pub(crate) struct DictBuilder {
    stack: Vec<Frame>,
}

impl DictBuilder {
    pub fn new() -> Self {
        DictBuilder {
            stack: vec![Frame::document()],
        }
    }

    pub fn push(&mut self, event: XmlEvent) {
        match event {
            XmlEvent::Start { name, attributes } => {
                self.stack.push(Frame::new(name, attributes));
            }
            XmlEvent::Text { content } => {
                if let Some(top) = self.stack.last_mut() {
                    top.text.push_str(&content);
                }
            }
            XmlEvent::End { .. } => self.close_top(),
        }
    }

    fn close_top(&mut self) {
        // The document frame itself never closes through events.
        if self.stack.len() < 2 {
            return;
        }
        let frame = match self.stack.pop() {
            Some(frame) => frame,
            None => return,
        };
        let (tag, value) = frame.into_value();
        if let Some(parent) = self.stack.last_mut() {
            parent.merge_child(tag, value);
        }
    }

    pub fn finish(mut self) -> Value {
        // Frames left open by max_events truncation fold up here.
        while self.stack.len() > 1 {
            self.close_top();
        }
        match self.stack.pop() {
            Some(document) if !document.children.is_empty() => Value::Map(document.children),
            _ => Value::Null,
        }
    }
}

/// Reduce a bounded event stream to its nested mapping form.
pub fn events_to_dict<I>(events: I) -> Result<Value>
where
    I: Iterator<Item = Result<EventRecord>>,
{
    let mut builder = DictBuilder::new();
    for record in events {
        builder.push(record?.event);
    }
    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::bounded::ParseLimits;
    use crate::{xml_to_dict_str, Error};
    use pretty_assertions::assert_eq;

    fn dict(input: &str) -> Value {
        xml_to_dict_str(input, None, None).unwrap()
    }

    fn map(entries: Vec<(&str, Value)>) -> Value {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    #[test]
    fn test_text_only_element() {
        assert_eq!(
            dict("<msg>Hello World</msg>"),
            map(vec![("msg", Value::from("Hello World"))])
        );
    }

    #[test]
    fn test_attribute_only_element() {
        assert_eq!(
            dict("<a id=\"1\"/>"),
            map(vec![("a", map(vec![("@id", Value::from("1"))]))])
        );
    }

    #[test]
    fn test_repeated_siblings_promote_to_list() {
        assert_eq!(
            dict("<root><item>1</item><item>2</item></root>"),
            map(vec![(
                "root",
                map(vec![(
                    "item",
                    Value::List(vec![Value::from("1"), Value::from("2")])
                )])
            )])
        );
    }

    #[test]
    fn test_promotion_appends_on_third_occurrence() {
        let result = dict("<r><x>1</x><x>2</x><x>3</x></r>");
        let items = result.get("r").and_then(|r| r.get("x")).unwrap();
        assert_eq!(
            items.as_list().map(<[Value]>::len),
            Some(3),
            "third sibling must append, not re-promote"
        );
    }

    #[test]
    fn test_single_child_stays_scalar() {
        assert_eq!(
            dict("<root><item>1</item></root>"),
            map(vec![("root", map(vec![("item", Value::from("1"))]))])
        );
    }

    #[test]
    fn test_empty_elements_are_null() {
        assert_eq!(
            dict("<root><empty></empty><also_empty/></root>"),
            map(vec![(
                "root",
                map(vec![("empty", Value::Null), ("also_empty", Value::Null)])
            )])
        );
    }

    #[test]
    fn test_whitespace_only_text_is_null() {
        assert_eq!(
            dict("<root>\n   \t\n</root>"),
            map(vec![("root", Value::Null)])
        );
    }

    #[test]
    fn test_text_with_attributes_under_text_key() {
        assert_eq!(
            dict("<a id=\"1\">hi</a>"),
            map(vec![(
                "a",
                map(vec![("@id", Value::from("1")), ("#text", Value::from("hi"))])
            )])
        );
    }

    #[test]
    fn test_text_trimmed_but_interior_preserved() {
        assert_eq!(
            dict("<m>  Hello   World  </m>"),
            map(vec![("m", Value::from("Hello   World"))])
        );
    }

    #[test]
    fn test_mixed_content_concatenates() {
        let result = dict("<a>pre<b/>post</a>");
        assert_eq!(
            result.get("a").and_then(|a| a.get("#text")),
            Some(&Value::from("prepost"))
        );
    }

    #[test]
    fn test_nested_structure() {
        let doc = "<person><name>John Doe</name><age>30</age><city>New York</city></person>";
        assert_eq!(
            dict(doc),
            map(vec![(
                "person",
                map(vec![
                    ("name", Value::from("John Doe")),
                    ("age", Value::from("30")),
                    ("city", Value::from("New York")),
                ])
            )])
        );
    }

    #[test]
    fn test_catalog_with_repeated_books() {
        let doc = "<catalog>\
                     <book><title>Book 1</title><author>Author 1</author></book>\
                     <book><title>Book 2</title><author>Author 2</author></book>\
                   </catalog>";
        assert_eq!(
            dict(doc),
            map(vec![(
                "catalog",
                map(vec![(
                    "book",
                    Value::List(vec![
                        map(vec![
                            ("title", Value::from("Book 1")),
                            ("author", Value::from("Author 1")),
                        ]),
                        map(vec![
                            ("title", Value::from("Book 2")),
                            ("author", Value::from("Author 2")),
                        ]),
                    ])
                )])
            )])
        );
    }

    #[test]
    fn test_attributes_and_children_together() {
        let doc = "<book id=\"7\"><title>T</title></book>";
        assert_eq!(
            dict(doc),
            map(vec![(
                "book",
                map(vec![("@id", Value::from("7")), ("title", Value::from("T"))])
            )])
        );
    }

    #[test]
    fn test_max_depth_shrinks_result() {
        let depth = 50;
        let mut doc = String::new();
        for i in 0..depth {
            doc.push_str(&format!("<level{i}>"));
        }
        doc.push_str("<content>deep value</content>");
        for i in (0..depth).rev() {
            doc.push_str(&format!("</level{i}>"));
        }

        let full = xml_to_dict_str(&doc, None, None).unwrap();
        let limited = xml_to_dict_str(&doc, Some(10), None).unwrap();
        assert_ne!(full, limited);
        assert_eq!(full.depth(), depth + 2);
        assert_eq!(limited.depth(), 11);
    }

    #[test]
    fn test_max_events_truncation_is_not_an_error() {
        let doc = "<root><a>1</a><b>2</b><c>3</c></root>";
        let full = xml_to_dict_str(doc, None, None).unwrap();
        let truncated = xml_to_dict_str(doc, None, Some(4)).unwrap();
        assert_ne!(full, truncated);
        // Truncated after </a>: the still-open root folds up around it.
        assert_eq!(
            truncated,
            map(vec![("root", map(vec![("a", Value::from("1"))]))])
        );
    }

    #[test]
    fn test_truncated_to_nothing_is_null() {
        assert_eq!(xml_to_dict_str("<a>x</a>", None, Some(0)).unwrap(), Value::Null);
    }

    #[test]
    fn test_error_is_all_or_nothing() {
        let err = xml_to_dict_str("<root><a>1</a><oops></root>", None, None).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { .. }));
    }

    #[test]
    fn test_events_to_dict_direct() {
        use crate::reader::stream::EventReader;
        let reader = EventReader::new(&b"<r><k>v</k></r>"[..]);
        let iter = crate::reader::bounded::EventIter::new(reader, ParseLimits::none());
        let value = events_to_dict(iter).unwrap();
        assert_eq!(value, map(vec![("r", map(vec![("k", Value::from("v"))]))]));
    }
}
