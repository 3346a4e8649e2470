use std::collections::VecDeque;
use std::fmt::Display;
use std::io::{self, BufRead, BufReader, Read};

use sequoia_openpgp as openpgp;
use tracing::{debug, warn};

use openpgp::armor::{Reader as ArmorReader, ReaderMode};
use openpgp::cert::CertParser;
use openpgp::parse::Parse;

use crate::core::errors::{KeyportError, Result};
use crate::core::models::key_ring::KeyRing;
use crate::core::models::key_ring_entry::KeyRingEntry;

const KEY_BLOCK_LABELS: [&str; 2] = ["PGP PUBLIC KEY BLOCK", "PGP PRIVATE KEY BLOCK"];

/// Counts the bytes pulled from the wrapped reader.
pub struct PositionReader<R> {
    inner: R,
    consumed: u64,
}

impl<R: Read> PositionReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, consumed: 0 }
    }
}

impl<R: Read> Read for PositionReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.consumed += n as u64;
        Ok(n)
    }
}

/// One top-level object of the input.
enum Block {
    Binary(Vec<u8>),
    Armored { label: String, text: Vec<u8> },
}

/// Label of an armor `-----BEGIN <label>-----` line.
fn begin_label(line: &[u8]) -> Option<String> {
    let line = std::str::from_utf8(line).ok()?.trim();
    line.strip_prefix("-----BEGIN ")?
        .strip_suffix("-----")
        .map(str::to_string)
}

fn is_end_line(line: &[u8]) -> bool {
    line.trim_ascii_start().starts_with(b"-----END ")
}

fn malformed(e: impl Display) -> KeyportError {
    KeyportError::MalformedRing {
        detail: e.to_string(),
    }
}

/// Lazily decodes every key ring found in a byte stream.
///
/// The stream may hold binary packet data, ASCII-armored blocks, or several
/// of them back to back. Only one block is held in memory at a time and rings
/// never span blocks. Armored blocks that are not key blocks are skipped
/// with a warning.
///
/// A framing failure (armor without an END line, read error) is yielded once
/// and ends the sequence. A block or ring that OpenPGP parsing rejects is
/// yielded as an error and decoding continues with the next one.
pub struct KeyMaterialDecoder<R: Read> {
    source: BufReader<PositionReader<R>>,
    /// BEGIN line met while reading a binary block.
    pending_line: Option<Vec<u8>>,
    ready: VecDeque<Result<KeyRing>>,
    unrecognized: usize,
    done: bool,
}

impl<R: Read> KeyMaterialDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            source: BufReader::new(PositionReader::new(reader)),
            pending_line: None,
            ready: VecDeque::new(),
            unrecognized: 0,
            done: false,
        }
    }

    /// Bytes of input consumed so far.
    pub fn offset(&self) -> u64 {
        self.source.get_ref().consumed - self.source.buffer().len() as u64
    }

    /// Number of top-level objects skipped because they are not key rings.
    pub fn unrecognized_objects(&self) -> usize {
        self.unrecognized
    }

    /// Adapt the decoder to yield entries instead of rings.
    pub fn entries(&mut self) -> impl Iterator<Item = Result<KeyRingEntry>> + '_ {
        self.by_ref()
            .map(|ring| ring.and_then(|ring| KeyRingEntry::new(&ring)))
    }

    fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        if let Some(line) = self.pending_line.take() {
            return Ok(Some(line));
        }
        let mut line = Vec::new();
        if self.source.read_until(b'\n', &mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }

    fn skip_whitespace(&mut self) -> io::Result<Option<u8>> {
        loop {
            let buf = self.source.fill_buf()?;
            if buf.is_empty() {
                return Ok(None);
            }
            let blank = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
            if blank < buf.len() {
                let first = buf[blank];
                self.source.consume(blank);
                return Ok(Some(first));
            }
            let len = buf.len();
            self.source.consume(len);
        }
    }

    /// Read the next top-level object, or `None` at the end of input.
    fn read_block(&mut self) -> Result<Option<Block>> {
        if self.pending_line.is_none() {
            let Some(first) = self.skip_whitespace()? else {
                return Ok(None);
            };
            if first & 0x80 != 0 {
                return self.read_binary().map(Some);
            }
        }
        self.read_armored()
    }

    /// Packet data up to the next armor BEGIN line or the end of input.
    fn read_binary(&mut self) -> Result<Block> {
        let start = self.offset();
        let mut data = Vec::new();
        while let Some(line) = self.next_line()? {
            if begin_label(&line).is_some() {
                self.pending_line = Some(line);
                // Blank lines separating the packets from the armor.
                let packets = data.trim_ascii_end().len();
                data.truncate(packets);
                break;
            }
            data.extend_from_slice(&line);
        }
        debug!(offset = start, len = data.len(), "binary block");
        Ok(Block::Binary(data))
    }

    /// Skip text up to a BEGIN line, then collect the block through its END line.
    fn read_armored(&mut self) -> Result<Option<Block>> {
        let (label, mut text) = loop {
            let Some(line) = self.next_line()? else {
                debug!("trailing text without an armor block");
                return Ok(None);
            };
            if let Some(label) = begin_label(&line) {
                break (label, line);
            }
        };
        let start = self.offset();

        loop {
            let Some(line) = self.next_line()? else {
                return Err(KeyportError::Parse {
                    detail: format!("'{label}' armor block has no END line"),
                });
            };
            let end = is_end_line(&line);
            text.extend_from_slice(&line);
            if end {
                break;
            }
        }
        debug!(offset = start, label = %label, "armored block");
        Ok(Some(Block::Armored { label, text }))
    }

    /// Decode one block into the queue of pending results.
    fn decode_block(&mut self, block: Block) {
        let binary = match block {
            Block::Binary(data) => data,
            Block::Armored { label, .. } if !KEY_BLOCK_LABELS.contains(&label.as_str()) => {
                let err = KeyportError::UnrecognizedObject { label };
                warn!(offset = self.offset(), "{err}, skipping");
                self.unrecognized += 1;
                return;
            }
            Block::Armored { text, .. } => {
                let mut binary = Vec::new();
                let mut reader = ArmorReader::from_bytes(&text, ReaderMode::Tolerant(None));
                if let Err(e) = reader.read_to_end(&mut binary) {
                    self.ready.push_back(Err(malformed(e)));
                    return;
                }
                binary
            }
        };

        match CertParser::from_bytes(&binary) {
            Ok(parser) => self.ready.extend(
                parser.map(|cert| cert.map_err(malformed).and_then(KeyRing::from_cert)),
            ),
            Err(e) => self.ready.push_back(Err(malformed(e))),
        }
    }
}

impl<R: Read> Iterator for KeyMaterialDecoder<R> {
    type Item = Result<KeyRing>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.ready.pop_front() {
                return Some(item);
            }
            if self.done {
                return None;
            }
            match self.read_block() {
                Ok(Some(block)) => self.decode_block(block),
                Ok(None) => self.done = true,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl<R: Read> std::iter::FusedIterator for KeyMaterialDecoder<R> {}
