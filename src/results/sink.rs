//! Downstream consumers of normalized samples

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use super::sample::SampleRecord;

/// The single aggregation collaborator a load run hands its samples to
pub trait SampleSink: Send {
    fn accept(&mut self, sample: SampleRecord) -> std::io::Result<()>;

    /// Called once per tick after a batch has been delivered
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Collects samples into a shared vector
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    samples: Arc<Mutex<Vec<SampleRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything received so far
    pub fn samples(&self) -> Vec<SampleRecord> {
        self.samples
            .lock()
            .map(|samples| samples.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.samples.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SampleSink for MemorySink {
    fn accept(&mut self, sample: SampleRecord) -> std::io::Result<()> {
        self.samples
            .lock()
            .map_err(|_| std::io::Error::other("sample buffer poisoned"))?
            .push(sample);
        Ok(())
    }
}

/// Forwards samples to an in-process aggregator task
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<SampleRecord>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::UnboundedSender<SampleRecord>) -> Self {
        Self { sender }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SampleRecord>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl SampleSink for ChannelSink {
    fn accept(&mut self, sample: SampleRecord) -> std::io::Result<()> {
        self.sender.send(sample).map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "sample receiver dropped")
        })
    }
}

/// Writes one JSON object per sample
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl JsonLinesSink<BufWriter<File>> {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> SampleSink for JsonLinesSink<W> {
    fn accept(&mut self, sample: SampleRecord) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, &sample)?;
        self.writer.write_all(b"\n")
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}
