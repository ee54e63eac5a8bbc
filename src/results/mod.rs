//! Streaming ingestion of the load generator's result log
//!
//! [`StreamingLogReader`] turns a delimiter-separated log that grows while
//! the load generator runs into a sequence of [`SampleRecord`]s. Columns are
//! resolved by header name, lines split across reads are reassembled, and
//! malformed lines are skipped.

pub mod columns;
pub mod lines;
pub mod parser;
pub mod reader;
pub mod sample;
pub mod sink;


pub use columns::{ColumnNames, HeaderIndex};
pub use parser::{LineParser, MalformedLine};
pub use reader::{ReaderOptions, ReaderState, StreamingLogReader, DEFAULT_CHUNK_BYTES};
pub use sample::{SampleRecord, GENERIC_ERROR};
pub use sink::{ChannelSink, JsonLinesSink, MemorySink, SampleSink};
