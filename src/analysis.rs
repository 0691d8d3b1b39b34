//! Narrative race analysis.
//!
//! The analysis itself is somebody else's job: this module builds the text
//! summary handed to an [`Analyst`] and runs the analyst off the event loop
//! thread so a slow or failing call never holds up the clock.

use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use tracing::{debug, warn};

use crate::error::{RaceError, Result};
use crate::format::format_time;
use crate::runner::RunnerStore;

/// Per-runner status, final time and laps as plain text.
pub fn race_summary(store: &RunnerStore) -> String {
    store
        .runners()
        .iter()
        .map(|r| {
            let laps = r
                .splits()
                .iter()
                .map(|s| format_time(s.lap))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "Runner: {}\nStatus: {}\nTotal: {}\nLaps: [{}]",
                r.name,
                if r.is_finished() { "Finished" } else { "Running" },
                r.final_time().map_or_else(|| "-".to_string(), format_time),
                laps
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub trait Analyst: Send + 'static {
    fn analyze(&self, summary: &str) -> Result<String>;
}

/// Runs a shell command with the summary on stdin; its stdout is the analysis.
#[derive(Debug, Clone)]
pub struct CommandAnalyst {
    command: String,
}

impl CommandAnalyst {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Analyst for CommandAnalyst {
    fn analyze(&self, summary: &str) -> Result<String> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // stdin is fed from its own thread while stdout drains below
        let writer = child.stdin.take().map(|mut stdin| {
            let summary = summary.to_owned();
            thread::spawn(move || stdin.write_all(summary.as_bytes()))
        });
        let output = child.wait_with_output()?;
        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                // the command stopped reading early; its output still counts
                Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => {
                    debug!("analysis command closed stdin early");
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    return Err(RaceError::Analysis("stdin writer panicked".into()));
                }
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RaceError::Analysis(format!(
                "`{}` exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }
        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            return Err(RaceError::Analysis("analyst returned no text".into()));
        }
        Ok(text)
    }
}

/// A background analysis whose result is picked up by polling.
#[derive(Debug)]
pub struct AnalysisJob {
    rx: Receiver<Result<String>>,
}

impl AnalysisJob {
    /// Refuses to start when no runner has a split yet.
    pub fn spawn<A: Analyst>(analyst: A, store: &RunnerStore) -> Result<Self> {
        if !store.has_splits() {
            return Err(RaceError::NothingToAnalyze);
        }
        let summary = race_summary(store);
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = analyst.analyze(&summary);
            if let Err(e) = &result {
                warn!("race analysis failed: {e}");
            }
            // receiver gone means the app quit first
            let _ = tx.send(result);
        });
        debug!("race analysis started");
        Ok(Self { rx })
    }

    /// `None` while the analyst is still working.
    pub fn poll(&self) -> Option<Result<String>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(RaceError::Analysis(
                "analysis worker stopped without a result".into(),
            ))),
        }
    }
}
