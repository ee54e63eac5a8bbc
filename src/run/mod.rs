//! Polling driver for one load run
//!
//! A [`LoadRun`] owns one [`ProcessSupervisor`] and one [`StreamingLogReader`]
//! bound to the same result log. Each tick asks the supervisor whether the
//! tool is done and pulls whatever new samples the log holds, forwarding them
//! to the single registered [`SampleSink`].

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn, Instrument, Span};

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::results::{ReaderOptions, ReaderState, SampleRecord, SampleSink, StreamingLogReader};
use crate::subprocess::{LaunchSpec, ProcessSupervisor, ShutdownPolicy, ShutdownSummary};

/// What a finished run leaves behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Files worth keeping: captured output and the result log, when present
    pub artifacts: Vec<PathBuf>,
    pub samples: u64,
    pub lines_skipped: u64,
    /// `None` when the load generator never started
    pub shutdown: Option<ShutdownSummary>,
}

pub struct LoadRun {
    spec: LaunchSpec,
    result_log: PathBuf,
    supervisor: ProcessSupervisor,
    reader: StreamingLogReader,
    sink: Option<Box<dyn SampleSink>>,
    poll_interval: Duration,
    startup_timeout: Option<Duration>,
    started: Option<Instant>,
    samples: u64,
    span: Span,
}

impl LoadRun {
    pub fn new(
        spec: LaunchSpec,
        result_log: impl Into<PathBuf>,
        options: ReaderOptions,
        policy: ShutdownPolicy,
    ) -> Self {
        let result_log = result_log.into();
        let span = tracing::info_span!("load_run", result_log = %result_log.display());
        let supervisor = ProcessSupervisor::new(policy)
            .with_span(tracing::info_span!(parent: &span, "supervisor"));
        let reader = StreamingLogReader::new(&result_log, options)
            .with_span(tracing::debug_span!(parent: &span, "results_reader"));

        Self {
            spec,
            result_log,
            supervisor,
            reader,
            sink: None,
            poll_interval: Duration::from_secs(1),
            startup_timeout: None,
            started: None,
            samples: 0,
            span,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        config.validate()?;
        let run = Self::new(
            config.launch_spec()?,
            config.result_log_path(),
            config.reader_options(),
            config.shutdown_policy(),
        )
        .with_poll_interval(config.timing.poll_interval);

        Ok(match config.timing.startup_timeout {
            Some(timeout) => run.with_startup_timeout(timeout),
            None => run,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Fail the run if the result log is still unreadable this long after start
    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = Some(timeout);
        self
    }

    pub fn result_log(&self) -> &Path {
        &self.result_log
    }

    pub fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }

    pub fn reader(&self) -> &StreamingLogReader {
        &self.reader
    }

    /// Samples delivered to the sink so far
    pub fn samples_delivered(&self) -> u64 {
        self.samples
    }

    /// Attach the consumer of this run's samples. Only one may be registered.
    pub fn register_sink(&mut self, sink: impl SampleSink + 'static) -> Result<()> {
        if self.sink.is_some() {
            return Err(HarnessError::SinkAlreadyRegistered);
        }
        self.sink = Some(Box::new(sink));
        Ok(())
    }

    /// Launch the load generator
    pub fn startup(&mut self) -> Result<()> {
        let pid = self.supervisor.start(&self.spec)?.pid();
        self.started = Some(Instant::now());
        info!(parent: &self.span, pid, "Load run started");
        Ok(())
    }

    /// One polling step. Returns `Ok(true)` once the tool has finished.
    pub async fn tick(&mut self) -> Result<bool> {
        let span = self.span.clone();
        self.tick_inner().instrument(span).await
    }

    async fn tick_inner(&mut self) -> Result<bool> {
        let finished = self.supervisor.check(&self.result_log)?;

        let samples = self.reader.pull(false).await;
        self.deliver(samples)?;

        if !finished && self.reader.state() == ReaderState::Unopened {
            if let (Some(timeout), Some(started)) = (self.startup_timeout, self.started) {
                if started.elapsed() >= timeout {
                    warn!(
                        "No results after {:.1}s, giving up",
                        started.elapsed().as_secs_f64()
                    );
                    return Err(HarnessError::EmptyResults {
                        path: self.result_log.clone(),
                    });
                }
            }
        }

        Ok(finished)
    }

    /// Start the tool, tick until it finishes, then drain and shut down.
    ///
    /// On failure the tool is still shut down before the error is returned.
    pub async fn run_to_completion(&mut self) -> Result<RunReport> {
        if let Err(e) = self.startup() {
            self.finish().await;
            return Err(e);
        }

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match self.tick().await {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => {
                    warn!(parent: &self.span, "Load run failed: {}", e);
                    self.finish().await;
                    return Err(e);
                }
            }
        }

        Ok(self.finish().await)
    }

    /// Stop the tool, deliver every remaining sample and release the log.
    ///
    /// Safe to call more than once; later calls only report.
    pub async fn finish(&mut self) -> RunReport {
        let span = self.span.clone();
        self.finish_inner().instrument(span).await
    }

    async fn finish_inner(&mut self) -> RunReport {
        let shutdown = self.supervisor.shutdown().await;

        let remaining = self.reader.pull(true).await;
        if let Err(e) = self.deliver(remaining) {
            warn!("Lost final samples: {}", e);
        }
        self.reader.close();

        let artifacts: Vec<PathBuf> = [
            &self.spec.stdout_path,
            &self.spec.stderr_path,
            &self.result_log,
        ]
        .into_iter()
        .filter(|path| path.is_file())
        .cloned()
        .collect();

        info!(
            samples = self.samples,
            skipped = self.reader.lines_skipped(),
            "Load run finished"
        );

        RunReport {
            artifacts,
            samples: self.samples,
            lines_skipped: self.reader.lines_skipped(),
            shutdown,
        }
    }

    fn deliver(&mut self, samples: Vec<SampleRecord>) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let Some(sink) = self.sink.as_mut() else {
            debug!(count = samples.len(), "No sink registered, dropping samples");
            return Ok(());
        };

        let count = samples.len();
        for (delivered, sample) in samples.into_iter().enumerate() {
            if let Err(e) = sink.accept(sample) {
                let lost = count - delivered;
                warn!(lost, "Sample sink rejected a sample: {}", e);
                return Err(HarnessError::io(
                    format!("Sample sink rejected a sample, {} not delivered", lost),
                    e,
                ));
            }
            self.samples += 1;
        }
        sink.flush()
            .map_err(|e| HarnessError::io("Failed to flush sample sink", e))?;

        debug!(count, total = self.samples, "Delivered samples");
        Ok(())
    }
}
