//! Query output reporting
//!
//! Sinks that render the manager's output strings to stdout and/or an
//! append-only log file, optionally prefixed with the replay clock.

use anyhow::{Context, Result};
use replay_query::{OutputSink, Seconds};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Format replay seconds as `mm:ss`
pub fn format_clock(seconds: Seconds) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Output sink that knows the replay time of the event being processed
pub trait ReportSink: OutputSink {
    fn set_time(&mut self, time: Seconds);

    /// Flush anything buffered; called once at the end of a run
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Optional `[mm:ss]` prefix shared by the sinks
#[derive(Debug, Clone, Copy, Default)]
struct Clock {
    enabled: bool,
    time: Seconds,
}

impl Clock {
    fn render(&self, output: &str) -> String {
        if self.enabled {
            format!("[{}] {}", format_clock(self.time), output)
        } else {
            output.to_string()
        }
    }
}

/// Prints outputs to stdout
#[derive(Debug, Default)]
pub struct ConsoleSink {
    clock: Clock,
}

impl ConsoleSink {
    pub fn new(clock: bool) -> Self {
        Self {
            clock: Clock { enabled: clock, time: 0.0 },
        }
    }
}

impl OutputSink for ConsoleSink {
    fn emit(&mut self, output: &str) {
        println!("{}", self.clock.render(output));
    }
}

impl ReportSink for ConsoleSink {
    fn set_time(&mut self, time: Seconds) {
        self.clock.time = time;
    }
}

/// Appends outputs to a log file
pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
    clock: Clock,
    failed: bool,
}

impl FileSink {
    /// Open `path` for appending and write a run header naming `replay`
    pub fn create(path: &Path, replay: &Path, clock: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open output file: {:?}", path))?;
        let mut writer = BufWriter::new(file);
        writeln!(
            writer,
            "# replay-query run {} ({})",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            replay.display()
        )
        .with_context(|| format!("Failed to write output file: {:?}", path))?;

        log::debug!("Appending query output to {:?}", path);
        Ok(Self {
            path: path.to_path_buf(),
            writer,
            clock: Clock { enabled: clock, time: 0.0 },
            failed: false,
        })
    }
}

impl OutputSink for FileSink {
    fn emit(&mut self, output: &str) {
        if let Err(e) = writeln!(self.writer, "{}", self.clock.render(output)) {
            // Report the first failure only; the run keeps going
            if !self.failed {
                log::error!("Failed to write to {:?}: {}", self.path, e);
                self.failed = true;
            }
        }
    }
}

impl ReportSink for FileSink {
    fn set_time(&mut self, time: Seconds) {
        self.clock.time = time;
    }

    fn finish(&mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush output file: {:?}", self.path))
    }
}

/// Forwards every output to two sinks
pub struct TeeSink<A, B> {
    first: A,
    second: B,
}

impl<A: ReportSink, B: ReportSink> TeeSink<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: ReportSink, B: ReportSink> OutputSink for TeeSink<A, B> {
    fn emit(&mut self, output: &str) {
        self.first.emit(output);
        self.second.emit(output);
    }
}

impl<A: ReportSink, B: ReportSink> ReportSink for TeeSink<A, B> {
    fn set_time(&mut self, time: Seconds) {
        self.first.set_time(time);
        self.second.set_time(time);
    }

    fn finish(&mut self) -> Result<()> {
        self.first.finish()?;
        self.second.finish()
    }
}

/// Build the sink described by the output settings
pub fn open_sink(
    echo: bool,
    clock: bool,
    file: Option<&Path>,
    replay: &Path,
) -> Result<Box<dyn ReportSink>> {
    let sink: Box<dyn ReportSink> = match (echo, file) {
        (true, Some(path)) => Box::new(TeeSink::new(
            ConsoleSink::new(clock),
            FileSink::create(path, replay, clock)?,
        )),
        (false, Some(path)) => Box::new(FileSink::create(path, replay, clock)?),
        (_, None) => Box::new(ConsoleSink::new(clock)),
    };
    Ok(sink)
}
