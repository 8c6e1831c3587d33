//! XML encoding detection and streaming conversion.
//!
//! Detects UTF-8 and UTF-16 (both byte orders) from the BOM or the initial
//! `<` byte pattern and transcodes UTF-16 input to UTF-8 on the fly, so the
//! rest of the pipeline only ever sees UTF-8. The XML declaration's
//! `encoding` pseudo-attribute is validated separately against
//! [`is_supported_label`]; anything outside the supported set fails with
//! `UnsupportedEncoding`.

use std::io::{self, Read};

use log::debug;

/// Detected transport encoding of the raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl XmlEncoding {
    /// Detect encoding from byte order mark or initial bytes.
    pub fn detect(input: &[u8]) -> Self {
        if input.len() < 2 {
            return XmlEncoding::Utf8;
        }

        match (input[0], input[1]) {
            // UTF-16 LE BOM: 0xFF 0xFE
            (0xFF, 0xFE) => XmlEncoding::Utf16Le,
            // UTF-16 BE BOM: 0xFE 0xFF
            (0xFE, 0xFF) => XmlEncoding::Utf16Be,
            // UTF-8 BOM: 0xEF 0xBB 0xBF
            (0xEF, 0xBB) if input.len() >= 3 && input[2] == 0xBF => XmlEncoding::Utf8,
            // No BOM: UTF-16 without a BOM still shows a null next to '<'
            (0x00, b'<') => XmlEncoding::Utf16Be,
            (b'<', 0x00) => XmlEncoding::Utf16Le,
            _ => XmlEncoding::Utf8,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            XmlEncoding::Utf8 => "UTF-8",
            XmlEncoding::Utf16Le => "UTF-16LE",
            XmlEncoding::Utf16Be => "UTF-16BE",
        }
    }
}

/// Whether `label` (from an XML declaration) names an encoding this crate
/// can decode. US-ASCII is a strict subset of UTF-8, so it passes through.
pub fn is_supported_label(label: &str) -> bool {
    matches!(
        label.to_ascii_lowercase().as_str(),
        "utf-8" | "utf8" | "us-ascii" | "ascii" | "utf-16" | "utf16" | "utf-16le" | "utf-16be"
    )
}

const CHUNK_SIZE: usize = 4096;

/// `Read` adapter that strips the BOM and transcodes UTF-16 input to UTF-8
/// chunk by chunk, carrying split code units and surrogate pairs across
/// chunk boundaries. UTF-8 input passes through untouched.
///
/// Broken UTF-16 (odd trailing byte, unpaired surrogate) surfaces as
/// `io::ErrorKind::InvalidData`, which the scanner reports as malformed
/// input rather than an I/O failure.
#[derive(Debug)]
pub struct DecodingReader<R: Read> {
    inner: R,
    encoding: Option<XmlEncoding>,
    /// Raw byte left over from an odd-length UTF-16 chunk.
    carry: Vec<u8>,
    /// High surrogate awaiting its low half.
    pending: Option<u16>,
    out: Vec<u8>,
    out_pos: usize,
    done: bool,
}

impl<R: Read> DecodingReader<R> {
    pub fn new(inner: R) -> Self {
        DecodingReader {
            inner,
            encoding: None,
            carry: Vec::new(),
            pending: None,
            out: Vec::new(),
            out_pos: 0,
            done: false,
        }
    }

    /// The detected encoding, once the first chunk has been read.
    pub fn encoding(&self) -> Option<XmlEncoding> {
        self.encoding
    }

    fn refill(&mut self) -> io::Result<()> {
        let mut raw = std::mem::take(&mut self.carry);
        let base = raw.len();
        raw.resize(base + CHUNK_SIZE, 0);
        let mut filled = base;
        loop {
            match self.inner.read(&mut raw[filled..]) {
                Ok(0) => {
                    self.done = true;
                    break;
                }
                Ok(n) => {
                    filled += n;
                    // Detection wants to see the BOM in one piece.
                    if self.encoding.is_some() || filled >= 4 {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        raw.truncate(filled);

        let encoding = match self.encoding {
            Some(enc) => enc,
            None => {
                let enc = XmlEncoding::detect(&raw);
                let bom = match enc {
                    XmlEncoding::Utf8 if raw.starts_with(&[0xEF, 0xBB, 0xBF]) => 3,
                    XmlEncoding::Utf16Le if raw.starts_with(&[0xFF, 0xFE]) => 2,
                    XmlEncoding::Utf16Be if raw.starts_with(&[0xFE, 0xFF]) => 2,
                    _ => 0,
                };
                raw.drain(..bom);
                debug!("detected input encoding {}", enc.label());
                self.encoding = Some(enc);
                enc
            }
        };

        match encoding {
            XmlEncoding::Utf8 => {
                self.out = raw;
                self.out_pos = 0;
                Ok(())
            }
            XmlEncoding::Utf16Le => self.transcode(raw, false),
            XmlEncoding::Utf16Be => self.transcode(raw, true),
        }
    }

    fn transcode(&mut self, mut raw: Vec<u8>, big_endian: bool) -> io::Result<()> {
        if raw.len() % 2 == 1 {
            if self.done {
                return Err(invalid_utf16("odd trailing byte"));
            }
            // Defer the split code unit to the next chunk.
            self.carry = vec![raw.pop().unwrap_or_default()];
        }

        let mut units: Vec<u16> = Vec::with_capacity(raw.len() / 2 + 1);
        if let Some(high) = self.pending.take() {
            units.push(high);
        }
        units.extend(raw.chunks_exact(2).map(|pair| {
            if big_endian {
                u16::from_be_bytes([pair[0], pair[1]])
            } else {
                u16::from_le_bytes([pair[0], pair[1]])
            }
        }));

        if let Some(&last) = units.last() {
            if (0xD800..=0xDBFF).contains(&last) && !self.done {
                // High surrogate at the chunk edge: its pair is still ahead.
                self.pending = units.pop();
            }
        }

        self.out.clear();
        self.out_pos = 0;
        let mut utf8 = [0u8; 4];
        for decoded in char::decode_utf16(units) {
            match decoded {
                Ok(c) => self.out.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes()),
                Err(_) => return Err(invalid_utf16("unpaired surrogate")),
            }
        }

        if self.done && self.pending.is_some() {
            return Err(invalid_utf16("truncated surrogate pair"));
        }
        Ok(())
    }
}

fn invalid_utf16(detail: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("invalid UTF-16 input: {detail}"),
    )
}

impl<R: Read> Read for DecodingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.out_pos >= self.out.len() {
            if self.done {
                if self.carry.is_empty() && self.pending.is_none() {
                    return Ok(0);
                }
                return Err(invalid_utf16("truncated input"));
            }
            self.refill()?;
        }
        let n = (self.out.len() - self.out_pos).min(buf.len());
        buf[..n].copy_from_slice(&self.out[self.out_pos..self.out_pos + n]);
        self.out_pos += n;
        Ok(n)
    }
}
