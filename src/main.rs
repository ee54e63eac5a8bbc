use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::{debug, error, trace, warn};

use loadgen_harness::results::{JsonLinesSink, ReaderOptions, SampleSink};
use loadgen_harness::{HarnessConfig, HarnessError, LoadRun, RunReport, StreamingLogReader};

/// Drive an external load generator and collect its samples
#[derive(Parser)]
#[command(name = "loadgen-harness")]
#[command(about = "Run a load generator and stream its result log into samples", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the load generator and follow its result log until it exits
    Run {
        /// Path to the TOML run configuration
        #[arg(short = 'c', long)]
        config: PathBuf,

        /// Where to write samples as JSON lines (default: <artifacts>/samples.jsonl)
        #[arg(short = 's', long)]
        samples: Option<PathBuf>,
    },
    /// Convert an existing result log to JSON lines on stdout
    Parse {
        /// Result log to read
        log: PathBuf,

        /// Field delimiter
        #[arg(short = 'd', long, default_value = ",")]
        delimiter: char,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .with_target(cli.verbose >= 2)
        .with_thread_ids(cli.verbose >= 3)
        .with_line_number(cli.verbose >= 3)
        .init();

    debug!("loadgen-harness started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    let result = match cli.command {
        Commands::Run { config, samples } => run_load(config, samples).await,
        Commands::Parse { log, delimiter } => parse_log(log, delimiter).await,
    };

    if let Err(e) = result {
        error!("Fatal error: {:#}", e);
        let code = match e.downcast_ref::<HarnessError>() {
            Some(harness) => {
                eprintln!("Error: {}", harness.user_message());
                harness.exit_code()
            }
            None => {
                eprintln!("Error: {e:#}");
                1
            }
        };
        std::process::exit(code);
    }
}

async fn run_load(config_path: PathBuf, samples: Option<PathBuf>) -> anyhow::Result<()> {
    let config = HarnessConfig::load(&config_path).await?;
    let mut run = LoadRun::from_config(&config)?;

    let samples_path = samples.unwrap_or_else(|| config.artifacts.dir.join("samples.jsonl"));
    if let Some(parent) = samples_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create {}", parent.display()))?;
    }
    let sink = JsonLinesSink::create(&samples_path)
        .with_context(|| format!("Cannot write samples to {}", samples_path.display()))?;
    run.register_sink(sink)?;

    let outcome = tokio::select! {
        result = run.run_to_completion() => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    let report = match outcome {
        Some(result) => result?,
        None => {
            warn!("Interrupted, stopping load generator");
            run.finish().await
        }
    };

    print_report(&report, &samples_path);
    Ok(())
}

async fn parse_log(log: PathBuf, delimiter: char) -> anyhow::Result<()> {
    if delimiter == '\n' || delimiter == '\r' {
        return Err(HarnessError::config("Delimiter cannot be a line terminator").into());
    }

    let metadata = tokio::fs::metadata(&log)
        .await
        .map_err(|e| HarnessError::io(format!("Cannot read {}", log.display()), e))?;
    if metadata.len() == 0 {
        return Err(HarnessError::EmptyResults { path: log }.into());
    }

    let options = ReaderOptions {
        delimiter,
        ..ReaderOptions::default()
    };
    let mut reader = StreamingLogReader::new(&log, options);
    let samples = reader.pull(true).await;
    reader.close();

    let mut sink = JsonLinesSink::new(BufWriter::new(std::io::stdout()));
    let count = samples.len();
    for sample in samples {
        sink.accept(sample).context("Failed to write sample")?;
    }
    sink.flush().context("Failed to write sample")?;

    debug!(
        count,
        skipped = reader.lines_skipped(),
        "Parsed {}",
        log.display()
    );
    Ok(())
}

fn print_report(report: &RunReport, samples_path: &std::path::Path) {
    println!(
        "Collected {} samples ({} malformed lines skipped) into {}",
        report.samples,
        report.lines_skipped,
        samples_path.display()
    );
    if let Some(shutdown) = &report.shutdown {
        match shutdown.exit_code {
            Some(code) => println!(
                "Load generator PID {} exited with code {} after {:.1}s",
                shutdown.pid,
                code,
                shutdown.elapsed.as_secs_f64()
            ),
            None => println!("Load generator PID {} state unknown", shutdown.pid),
        }
    }
    for artifact in &report.artifacts {
        println!("Artifact: {}", artifact.display());
    }
}
