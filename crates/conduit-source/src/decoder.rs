//! Bounded streaming decoder for newline-delimited JSON sources.
//!
//! A decode call opens the source once and pulls transport chunks only when
//! no complete line is buffered, so the buffer never holds more than one
//! partial record plus one chunk. Lines are split on bytes (`\n`, with `\r\n`
//! tolerated) before UTF-8 decoding, so multi-byte characters straddling a
//! chunk boundary are safe.
//!
//! Ordinals count non-blank lines from the start of the source, whether or not
//! they parse. `skip` discards the first `skip` ordinals without parsing them;
//! this is O(skipped lines) because sources have no random-access index.
//! `limit` counts successfully decoded records only; once reached, the
//! transport stream is dropped and nothing more is read.

use std::marker::PhantomData;

use bytes::{Bytes, BytesMut};
use conduit_core::errors::RecordParseError;
use serde::de::DeserializeOwned;

use crate::error::SourceError;
use crate::source::{ByteSource, ByteStream};

/// Buffer sizing for a decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Initial buffer capacity.
    pub buffer_bytes: usize,
    /// Lines longer than this are discarded and reported as malformed.
    pub max_record_bytes: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            buffer_bytes: 64 * 1024,
            max_record_bytes: 1024 * 1024,
        }
    }
}

/// Where a decode call starts and how many records it may yield.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    pub limit: Option<u64>,
    pub skip: u64,
}

impl DecodeOptions {
    /// Decode the whole source.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            limit: None,
            skip: 0,
        }
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn with_skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }
}

/// One non-blank source line.
#[derive(Debug)]
pub enum Decoded<T> {
    Record { ordinal: u64, value: T },
    Malformed { ordinal: u64, error: RecordParseError },
}

impl<T> Decoded<T> {
    #[must_use]
    pub const fn ordinal(&self) -> u64 {
        match self {
            Self::Record { ordinal, .. } | Self::Malformed { ordinal, .. } => *ordinal,
        }
    }
}

/// Decodes records out of any [`ByteSource`].
#[derive(Debug, Clone)]
pub struct Decoder<S> {
    source: S,
    config: DecoderConfig,
}

impl<S: ByteSource> Decoder<S> {
    pub const fn new(source: S, config: DecoderConfig) -> Self {
        Self { source, config }
    }

    pub const fn source(&self) -> &S {
        &self.source
    }

    pub const fn config(&self) -> DecoderConfig {
        self.config
    }

    /// Open `source_id` and return a lazy record stream over it.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the source cannot be opened.
    pub async fn decode<T: DeserializeOwned>(
        &self,
        source_id: &str,
        options: DecodeOptions,
    ) -> Result<RecordStream<T>, SourceError> {
        let bytes = self.source.open(source_id).await?;
        tracing::debug!(
            source_id,
            size_hint = ?bytes.size_hint(),
            skip = options.skip,
            limit = ?options.limit,
            "decode started"
        );
        Ok(RecordStream::new(source_id, bytes, options, self.config))
    }
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

enum Line {
    Complete(Bytes),
    Oversized,
}

/// A single decode call in progress. Pull with [`RecordStream::next`].
pub struct RecordStream<T> {
    source_id: String,
    bytes: ByteStream,
    size_hint: Option<u64>,
    options: DecodeOptions,
    max_record_bytes: usize,

    buf: BytesMut,
    /// Prefix of `buf` already known to hold no newline.
    scanned: usize,
    /// Dropping an oversized line until its newline arrives.
    discarding: bool,
    /// An oversized line finished and still needs reporting.
    pending_oversized: bool,
    eof: bool,
    done: bool,
    exhausted: bool,
    /// No line has been split off yet; a leading byte-order mark is dropped.
    at_start: bool,

    lines_consumed: u64,
    records_yielded: u64,
    parse_errors: u64,
    bytes_consumed: u64,
    _record: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> RecordStream<T> {
    fn new(source_id: &str, bytes: ByteStream, options: DecodeOptions, config: DecoderConfig) -> Self {
        Self {
            source_id: source_id.to_string(),
            size_hint: bytes.size_hint(),
            bytes,
            options,
            max_record_bytes: config.max_record_bytes.max(1),
            buf: BytesMut::with_capacity(config.buffer_bytes),
            scanned: 0,
            discarding: false,
            pending_oversized: false,
            eof: false,
            done: false,
            exhausted: false,
            at_start: true,
            lines_consumed: 0,
            records_yielded: 0,
            parse_errors: 0,
            bytes_consumed: 0,
            _record: PhantomData,
        }
    }

    /// Next decoded line, or `None` once the source or the limit is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the transport fails mid-stream. The stream
    /// is finished afterwards.
    pub async fn next(&mut self) -> Result<Option<Decoded<T>>, SourceError> {
        loop {
            if self.done {
                return Ok(None);
            }
            if self
                .options
                .limit
                .is_some_and(|limit| self.records_yielded >= limit)
            {
                self.finish(false);
                return Ok(None);
            }

            let line = match self.take_line() {
                Some(line) => line,
                None if self.eof => match self.take_tail() {
                    Some(line) => line,
                    None => {
                        self.finish(true);
                        return Ok(None);
                    }
                },
                None => {
                    self.fill().await?;
                    continue;
                }
            };

            if let Line::Complete(bytes) = &line
                && bytes.iter().all(u8::is_ascii_whitespace)
            {
                continue;
            }
            let ordinal = self.lines_consumed;
            self.lines_consumed += 1;
            if ordinal < self.options.skip {
                continue;
            }

            return Ok(Some(match self.parse(ordinal, line) {
                Ok(value) => {
                    self.records_yielded += 1;
                    Decoded::Record { ordinal, value }
                }
                Err(error) => {
                    self.parse_errors += 1;
                    tracing::debug!(source_id = %self.source_id, ordinal, %error, "malformed line");
                    Decoded::Malformed { ordinal, error }
                }
            }));
        }
    }

    fn parse(&self, ordinal: u64, line: Line) -> Result<T, RecordParseError> {
        let bytes = match line {
            Line::Complete(bytes) => bytes,
            Line::Oversized => {
                return Err(RecordParseError::new(
                    ordinal,
                    format!("record exceeds {} bytes", self.max_record_bytes),
                ));
            }
        };
        let text = std::str::from_utf8(&bytes)
            .map_err(|e| RecordParseError::new(ordinal, format!("invalid UTF-8: {e}")))?;
        serde_json::from_str(text.trim()).map_err(|e| RecordParseError::new(ordinal, e.to_string()))
    }
}

impl<T> RecordStream<T> {
    async fn fill(&mut self) -> Result<(), SourceError> {
        match self.bytes.next_chunk().await {
            None => self.eof = true,
            Some(Ok(chunk)) => self.absorb(&chunk),
            Some(Err(e)) => {
                tracing::warn!(source_id = %self.source_id, error = %e, "source read failed");
                self.finish(false);
                return Err(e);
            }
        }
        Ok(())
    }

    fn absorb(&mut self, mut chunk: &[u8]) {
        if self.discarding {
            match chunk.iter().position(|&b| b == b'\n') {
                None => {
                    self.bytes_consumed += chunk.len() as u64;
                    return;
                }
                Some(i) => {
                    self.bytes_consumed += (i + 1) as u64;
                    chunk = &chunk[i + 1..];
                    self.discarding = false;
                    self.pending_oversized = true;
                }
            }
        }
        self.buf.extend_from_slice(chunk);
    }

    fn take_line(&mut self) -> Option<Line> {
        if self.pending_oversized {
            self.pending_oversized = false;
            return Some(Line::Oversized);
        }
        if let Some(pos) = self.buf[self.scanned..].iter().position(|&b| b == b'\n') {
            let end = self.scanned + pos;
            let mut line = self.buf.split_to(end + 1);
            self.scanned = 0;
            self.bytes_consumed += line.len() as u64;
            line.truncate(end);
            return Some(self.classify(line.freeze()));
        }
        self.scanned = self.buf.len();
        if self.buf.len() > self.max_record_bytes {
            tracing::warn!(
                source_id = %self.source_id,
                max_record_bytes = self.max_record_bytes,
                "discarding oversized record"
            );
            self.bytes_consumed += self.buf.len() as u64;
            self.buf.clear();
            self.scanned = 0;
            self.discarding = true;
            self.at_start = false;
        }
        None
    }

    /// The unterminated final line, once the transport has ended.
    fn take_tail(&mut self) -> Option<Line> {
        if self.discarding {
            self.discarding = false;
            return Some(Line::Oversized);
        }
        if self.buf.is_empty() {
            return None;
        }
        let line = self.buf.split().freeze();
        self.scanned = 0;
        self.bytes_consumed += line.len() as u64;
        Some(self.classify(line))
    }

    fn classify(&mut self, mut line: Bytes) -> Line {
        if std::mem::take(&mut self.at_start) && line.starts_with(UTF8_BOM) {
            line = line.slice(UTF8_BOM.len()..);
        }
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }
        if line.len() > self.max_record_bytes {
            Line::Oversized
        } else {
            Line::Complete(line)
        }
    }

    fn finish(&mut self, exhausted: bool) {
        if self.done {
            return;
        }
        self.done = true;
        self.exhausted = exhausted;
        self.bytes = ByteStream::empty();
        self.buf = BytesMut::new();
        tracing::debug!(
            source_id = %self.source_id,
            lines = self.lines_consumed,
            records = self.records_yielded,
            parse_errors = self.parse_errors,
            exhausted,
            "decode finished"
        );
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Total source size in bytes, when the transport reported one.
    pub const fn size_hint(&self) -> Option<u64> {
        self.size_hint
    }

    /// Non-blank lines consumed so far, including skipped ones.
    pub const fn lines_consumed(&self) -> u64 {
        self.lines_consumed
    }

    pub const fn records_yielded(&self) -> u64 {
        self.records_yielded
    }

    pub const fn parse_errors(&self) -> u64 {
        self.parse_errors
    }

    /// Source bytes consumed so far, newlines included.
    pub const fn bytes_consumed(&self) -> u64 {
        self.bytes_consumed
    }

    /// Whether the stream ended because the source ran out (not the limit or
    /// an error).
    pub const fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Bytes currently buffered.
    pub fn buffered_bytes(&self) -> usize {
        self.buf.len()
    }
}

impl<T> std::fmt::Debug for RecordStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStream")
            .field("source_id", &self.source_id)
            .field("lines_consumed", &self.lines_consumed)
            .field("records_yielded", &self.records_yielded)
            .field("parse_errors", &self.parse_errors)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}
