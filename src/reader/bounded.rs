//! Bounded event iteration.
//!
//! Wraps an [`EventReader`] and applies [`ParseLimits`]: `max_events` ends
//! the iteration cleanly after the Nth yielded event, and `max_depth`
//! suppresses everything nested deeper than the limit while still driving
//! the scanner through the suppressed subtree. Neither limit is an error;
//! both cost O(1) bookkeeping per event.
//!
//! Depth is 1 at the root. An element at exactly `max_depth` is yielded in
//! full; only strictly deeper elements are suppressed, so the consumer
//! always sees a balanced (pruned) stream unless `max_events` cut it short.

use std::io::Read;

use log::{debug, trace};

use super::events::{EventRecord, XmlEvent};
use super::stream::EventReader;
use crate::error::Result;

/// Protection limits for one iteration pass. Absent fields are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseLimits {
    pub max_depth: Option<usize>,
    pub max_events: Option<u64>,
}

impl ParseLimits {
    /// No limits: the stream is bounded only by the input.
    pub fn none() -> Self {
        ParseLimits::default()
    }

    pub fn new(max_depth: Option<usize>, max_events: Option<u64>) -> Self {
        ParseLimits {
            max_depth,
            max_events,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_max_events(mut self, events: u64) -> Self {
        self.max_events = Some(events);
        self
    }
}

/// Lazy sequence of [`EventRecord`]s with limits applied.
///
/// Yields `Err` exactly once if the scanner fails, after every well-formed
/// event before the failure point; the iterator is fused afterwards.
#[derive(Debug)]
pub struct EventIter<R: Read> {
    reader: EventReader<R>,
    limits: ParseLimits,
    /// Sequence number of the last yielded record.
    sequence: u64,
    /// Depth of yielded (non-suppressed) opens.
    depth: usize,
    /// Nesting count inside a suppressed subtree; 0 when yielding normally.
    suppressed: usize,
    done: bool,
}

impl<R: Read> EventIter<R> {
    pub(crate) fn new(reader: EventReader<R>, limits: ParseLimits) -> Self {
        EventIter {
            reader,
            limits,
            sequence: 0,
            depth: 0,
            suppressed: 0,
            done: false,
        }
    }

    pub fn limits(&self) -> ParseLimits {
        self.limits
    }
}

impl<R: Read> Iterator for EventIter<R> {
    type Item = Result<EventRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(max) = self.limits.max_events {
            if self.sequence >= max {
                debug!("event limit {max} reached, truncating stream");
                self.done = true;
                return None;
            }
        }

        loop {
            let event = match self.reader.next_event() {
                Ok(Some(event)) => event,
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            match event {
                XmlEvent::Start { .. } => {
                    if self.suppressed > 0 {
                        self.suppressed += 1;
                        continue;
                    }
                    if let Some(max) = self.limits.max_depth {
                        if self.depth + 1 > max {
                            trace!("suppressing subtree below depth limit {max}");
                            self.suppressed = 1;
                            continue;
                        }
                    }
                    self.depth += 1;
                }
                XmlEvent::End { .. } => {
                    if self.suppressed > 0 {
                        self.suppressed -= 1;
                        continue;
                    }
                    self.depth -= 1;
                }
                XmlEvent::Text { .. } => {
                    if self.suppressed > 0 {
                        continue;
                    }
                }
            }

            self.sequence += 1;
            return Some(Ok(EventRecord {
                sequence: self.sequence,
                event,
            }));
        }
    }
}
