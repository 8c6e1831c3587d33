//! Refilling byte window over any `Read` source.
//!
//! Combines a compacting stream buffer with memchr-driven delimiter
//! searches. The window only ever holds the token currently being decoded:
//! it is compacted as bytes are consumed and grows only when a single token
//! is larger than the buffer. Consumed bytes update the running
//! [`Position`], so errors carry exact offsets.

use std::io::{self, Read};

use memchr::{memchr, memchr_iter};

use crate::error::{Error, Position, Result};

const DEFAULT_BUF_SIZE: usize = 8192;

/// Streaming scanner window.
#[derive(Debug)]
pub struct BufSource<R: Read> {
    reader: R,
    buf: Vec<u8>,
    /// Window start within `buf`.
    start: usize,
    /// Valid data end within `buf`.
    end: usize,
    eof: bool,
    /// Position of `buf[start]` in the decoded stream.
    pos: Position,
}

impl<R: Read> BufSource<R> {
    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, DEFAULT_BUF_SIZE)
    }

    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        BufSource {
            reader,
            buf: vec![0u8; capacity.max(16)],
            start: 0,
            end: 0,
            eof: false,
            pos: Position::start(),
        }
    }

    /// Position of the next unconsumed byte.
    #[inline]
    pub fn position(&self) -> Position {
        self.pos
    }

    /// Number of buffered, unconsumed bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Borrow window bytes `[from, to)`. The range must already be buffered.
    #[inline]
    pub fn slice(&self, from: usize, to: usize) -> &[u8] {
        &self.buf[self.start + from..self.start + to]
    }

    /// Pull more bytes from the reader, compacting (and growing, if the
    /// window already fills the buffer) first. Returns false at EOF.
    fn fill(&mut self) -> Result<bool> {
        if self.eof {
            return Ok(false);
        }

        if self.start > 0 {
            self.buf.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }
        if self.end == self.buf.len() {
            // A single token outgrew the buffer.
            let grown = self.buf.len() * 2;
            self.buf.resize(grown, 0);
        }

        loop {
            match self.reader.read(&mut self.buf[self.end..]) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(false);
                }
                Ok(n) => {
                    self.end += n;
                    return Ok(true);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    // The decoding layer reports broken UTF-16 this way.
                    return Err(Error::malformed(self.pos, e.to_string()));
                }
                Err(e) => return Err(Error::Io(e)),
            }
        }
    }

    /// Buffer at least `n` bytes if the source has them. Returns the window
    /// length, which is smaller than `n` only at EOF.
    pub fn ensure(&mut self, n: usize) -> Result<usize> {
        while self.len() < n {
            if !self.fill()? {
                break;
            }
        }
        Ok(self.len())
    }

    /// Peek the next unconsumed byte.
    pub fn peek(&mut self) -> Result<Option<u8>> {
        if self.ensure(1)? == 0 {
            return Ok(None);
        }
        Ok(Some(self.buf[self.start]))
    }

    /// Peek the byte at window offset `i`.
    pub fn peek_at(&mut self, i: usize) -> Result<Option<u8>> {
        self.ensure(i + 1)?;
        if i < self.len() {
            Ok(Some(self.buf[self.start + i]))
        } else {
            Ok(None)
        }
    }

    /// Check whether the window starts with `needle`, refilling as needed.
    pub fn starts_with(&mut self, needle: &[u8]) -> Result<bool> {
        self.ensure(needle.len())?;
        Ok(self.buf[self.start..self.end].starts_with(needle))
    }

    /// Find `byte` at or after window offset `from`, refilling as needed.
    /// `Ok(None)` means EOF was reached first.
    pub fn find_byte(&mut self, byte: u8, from: usize) -> Result<Option<usize>> {
        let mut searched = from.min(self.len());
        loop {
            if let Some(i) = memchr(byte, &self.buf[self.start + searched..self.end]) {
                return Ok(Some(searched + i));
            }
            searched = self.len();
            if !self.fill()? {
                return Ok(None);
            }
        }
    }

    /// Find the byte sequence `needle` at or after window offset `from`,
    /// refilling as needed.
    pub fn find_seq(&mut self, needle: &[u8], from: usize) -> Result<Option<usize>> {
        debug_assert!(!needle.is_empty());
        let mut at = from.min(self.len());
        loop {
            match memchr(needle[0], &self.buf[self.start + at..self.end]) {
                Some(i) => {
                    let cand = at + i;
                    if self.len() - cand >= needle.len() {
                        if self.slice(cand, cand + needle.len()) == needle {
                            return Ok(Some(cand));
                        }
                        at = cand + 1;
                        continue;
                    }
                    // Partial match at the window edge: refill to compare.
                    at = cand;
                }
                None => at = self.len(),
            }
            if !self.fill()? {
                return Ok(None);
            }
        }
    }

    /// Find the `>` closing a tag, skipping `>` inside quoted attribute
    /// values. Refills as needed; `Ok(None)` means EOF came first.
    pub fn find_tag_end(&mut self, from: usize) -> Result<Option<usize>> {
        let mut at = from.min(self.len());
        let mut quote: Option<u8> = None;
        loop {
            while at < self.len() {
                let b = self.buf[self.start + at];
                match quote {
                    Some(q) => {
                        if b == q {
                            quote = None;
                        }
                    }
                    None => match b {
                        b'"' | b'\'' => quote = Some(b),
                        b'>' => return Ok(Some(at)),
                        _ => {}
                    },
                }
                at += 1;
            }
            if !self.fill()? {
                return Ok(None);
            }
        }
    }

    /// Consume `n` buffered bytes, advancing the position.
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.len());
        let consumed = &self.buf[self.start..self.start + n];
        let mut newlines = 0u32;
        let mut last_newline = None;
        for i in memchr_iter(b'\n', consumed) {
            newlines += 1;
            last_newline = Some(i);
        }
        match last_newline {
            Some(i) => {
                self.pos.line += newlines;
                self.pos.column = (n - i) as u32;
            }
            None => self.pos.column += n as u32,
        }
        self.pos.offset += n as u64;
        self.start += n;
    }
}
