//! Edge-count aggregation: occurrence counts per structural path.
//!
//! Every `Start` event increments the count for the path of tag names from
//! the document root down to the started element. `End` and `Text` events
//! never touch the table. The optional `n_max` cap bounds how many `Start`
//! events are examined, for fast approximate counts on huge files; once the
//! cap is reached no further input is consumed.

use indexmap::IndexMap;
use log::debug;

use crate::error::Result;
use crate::reader::events::{EventRecord, XmlEvent};

/// Tag names from the document root to the counted element, inclusive.
pub type PathKey = Vec<String>;

/// Occurrence counts per structural path. Counts never decrease during a
/// traversal, and two passes over the same input yield the same table.
pub type EdgeCountTable = IndexMap<PathKey, u64>;

/// Tally `Start` events by ancestor path, examining at most `n_max` of them.
pub fn count_edges<I>(events: I, n_max: Option<u64>) -> Result<EdgeCountTable>
where
    I: Iterator<Item = Result<EventRecord>>,
{
    let mut counts = EdgeCountTable::new();
    if n_max == Some(0) {
        return Ok(counts);
    }

    let mut path: PathKey = Vec::new();
    let mut starts: u64 = 0;
    for record in events {
        match record?.event {
            XmlEvent::Start { name, .. } => {
                path.push(name);
                *counts.entry(path.clone()).or_insert(0) += 1;
                starts += 1;
                if let Some(max) = n_max {
                    if starts >= max {
                        debug!("edge tally stopped after {max} start events");
                        break;
                    }
                }
            }
            XmlEvent::End { .. } => {
                path.pop();
            }
            XmlEvent::Text { .. } => {}
        }
    }
    Ok(counts)
}
