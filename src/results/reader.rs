//! Incremental reader for a result log that is still being written
//!
//! The load generator appends to its log without any coordination, so a read
//! may stop anywhere, including in the middle of a line. The reader keeps its
//! file position and an unterminated tail between calls and only parses lines
//! once their terminator has arrived.

use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn, Instrument, Span};

use super::columns::{ColumnNames, HeaderIndex};
use super::lines::{trim_line, LineAssembler};
use super::parser::LineParser;
use super::sample::SampleRecord;

/// Default ceiling for one incremental read
pub const DEFAULT_CHUNK_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ReaderOptions {
    pub delimiter: char,
    /// Upper bound on bytes consumed by a non-draining pull
    pub chunk_bytes: usize,
    pub columns: ColumnNames,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            chunk_bytes: DEFAULT_CHUNK_BYTES,
            columns: ColumnNames::default(),
        }
    }
}

/// Externally visible reader state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// No handle yet; the log is missing or empty
    Unopened,
    Opened,
    Closed,
}

struct LogCursor {
    file: File,
    header: Option<HeaderIndex>,
    parser: Option<LineParser>,
    lines: LineAssembler,
    bytes_read: u64,
}

enum CursorSlot {
    Unopened,
    Opened(LogCursor),
    Closed,
}

/// Pull-based reader over one result log path
pub struct StreamingLogReader {
    path: PathBuf,
    options: ReaderOptions,
    slot: CursorSlot,
    lines_skipped: u64,
    span: Span,
}

impl StreamingLogReader {
    pub fn new(path: impl Into<PathBuf>, options: ReaderOptions) -> Self {
        let path = path.into();
        let span = tracing::debug_span!("results_reader", path = %path.display());
        Self {
            path,
            options,
            slot: CursorSlot::Unopened,
            lines_skipped: 0,
            span,
        }
    }

    /// Route this reader's log events through the caller's span
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> ReaderState {
        match self.slot {
            CursorSlot::Unopened => ReaderState::Unopened,
            CursorSlot::Opened(_) => ReaderState::Opened,
            CursorSlot::Closed => ReaderState::Closed,
        }
    }

    /// Header mapping, once the first line has been read
    pub fn header(&self) -> Option<&HeaderIndex> {
        match &self.slot {
            CursorSlot::Opened(cursor) => cursor.header.as_ref(),
            _ => None,
        }
    }

    /// Bytes consumed from the log so far
    pub fn bytes_read(&self) -> u64 {
        match &self.slot {
            CursorSlot::Opened(cursor) => cursor.bytes_read,
            _ => 0,
        }
    }

    /// Bytes read but still waiting for a line terminator
    pub fn pending_bytes(&self) -> usize {
        match &self.slot {
            CursorSlot::Opened(cursor) => cursor.lines.pending(),
            _ => 0,
        }
    }

    /// Data lines dropped as malformed
    pub fn lines_skipped(&self) -> u64 {
        self.lines_skipped
    }

    /// Read newly appended data and return the samples it completes.
    ///
    /// Reads at most `chunk_bytes` unless `drain_all` is set, in which case
    /// everything currently in the file is consumed. Returns nothing, without
    /// error, while the log does not exist or is empty.
    pub async fn pull(&mut self, drain_all: bool) -> Vec<SampleRecord> {
        let span = self.span.clone();
        self.pull_inner(drain_all).instrument(span).await
    }

    /// Drop the file handle; later pulls return nothing
    pub fn close(&mut self) {
        if let CursorSlot::Opened(cursor) = &self.slot {
            debug!(
                parent: &self.span,
                bytes_read = cursor.bytes_read,
                pending = cursor.lines.pending(),
                "Closing results log"
            );
        }
        self.slot = CursorSlot::Closed;
    }

    async fn pull_inner(&mut self, drain_all: bool) -> Vec<SampleRecord> {
        if let CursorSlot::Unopened = self.slot {
            match self.open().await {
                Some(cursor) => self.slot = CursorSlot::Opened(cursor),
                None => return Vec::new(),
            }
        }

        let CursorSlot::Opened(cursor) = &mut self.slot else {
            return Vec::new();
        };

        let limit = (!drain_all).then_some(self.options.chunk_bytes as u64);
        let chunk = match read_chunk(&mut cursor.file, limit).await {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("Failed to read results: {}", e);
                return Vec::new();
            }
        };
        debug!(bytes = chunk.len(), drain_all, "Reading results");
        cursor.bytes_read += chunk.len() as u64;

        let mut samples = Vec::new();
        for raw in cursor.lines.push(&chunk) {
            let line = String::from_utf8_lossy(trim_line(&raw));

            let Some(parser) = &cursor.parser else {
                let index = HeaderIndex::from_header(&line, self.options.delimiter);
                let missing = index.missing(&self.options.columns);
                if !missing.is_empty() {
                    warn!(?missing, "Results header lacks expected columns");
                }
                info!(columns = index.len(), "Results header read");
                cursor.parser = Some(LineParser::new(
                    index.resolve(&self.options.columns),
                    self.options.delimiter,
                ));
                cursor.header = Some(index);
                continue;
            };

            if line.is_empty() {
                continue;
            }

            match parser.parse(&line) {
                Ok(sample) => samples.push(sample),
                Err(reason) => {
                    self.lines_skipped += 1;
                    debug!("Skipping line: {} ({})", line, reason);
                }
            }
        }

        samples
    }

    async fn open(&self) -> Option<LogCursor> {
        let meta = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta,
            Err(_) => {
                debug!("File not appeared yet");
                return None;
            }
        };

        if !meta.is_file() {
            debug!("Results path is not a regular file yet");
            return None;
        }
        if meta.len() == 0 {
            debug!("File is empty: {}", self.path.display());
            return None;
        }

        match File::open(&self.path).await {
            Ok(file) => {
                info!("Opened results log");
                Some(LogCursor {
                    file,
                    header: None,
                    parser: None,
                    lines: LineAssembler::new(),
                    bytes_read: 0,
                })
            }
            Err(e) => {
                debug!("Results log not readable yet: {}", e);
                None
            }
        }
    }
}

async fn read_chunk(file: &mut File, limit: Option<u64>) -> std::io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    match limit {
        Some(limit) => {
            (&mut *file).take(limit).read_to_end(&mut buffer).await?;
        }
        None => {
            file.read_to_end(&mut buffer).await?;
        }
    }
    Ok(buffer)
}
