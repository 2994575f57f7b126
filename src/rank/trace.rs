//! Per-pair trace capture for ranking runs.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Mutex};
use std::thread::JoinHandle;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::{ComparisonResult, Document};

/// One line of trace output: a distinct pair judged during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonTrace {
    pub timestamp_ms: i64,
    pub run_id: String,
    pub comparison_index: usize,
    pub doc_a: String,
    pub doc_b: String,
    pub doc_a_hash: String,
    pub doc_b_hash: String,
    pub criteria_judged: usize,
    pub winner: Option<String>,
    pub weighted_score_a: f64,
    pub weighted_score_b: f64,
    pub latency_ms: u64,
    pub error: Option<String>,
}

impl ComparisonTrace {
    pub fn from_result(
        run_id: Uuid,
        comparison_index: usize,
        doc_a: &Document,
        doc_b: &Document,
        result: &ComparisonResult,
        latency_ms: u64,
    ) -> Self {
        Self {
            timestamp_ms: Utc::now().timestamp_millis(),
            run_id: run_id.to_string(),
            comparison_index,
            doc_a: result.doc_a.clone(),
            doc_b: result.doc_b.clone(),
            doc_a_hash: content_hash(&doc_a.content),
            doc_b_hash: content_hash(&doc_b.content),
            criteria_judged: result.evaluations.len(),
            winner: result.winner.clone(),
            weighted_score_a: result.weighted_score_a,
            weighted_score_b: result.weighted_score_b,
            latency_ms,
            error: result.error.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("cannot create trace file {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("trace write failed: {0}")]
    Write(#[from] std::io::Error),
    #[error("trace encode failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("trace writer already stopped")]
    WriterStopped,
    #[error("trace writer panicked")]
    WriterPanicked,
}

/// Receives one trace per judged pair. Called from inside the sort, so
/// implementations must not block for long.
pub trait TraceSink: Send + Sync {
    fn record(&self, trace: ComparisonTrace) -> Result<(), TraceError>;
}

/// Keeps traces in memory, in arrival order.
#[derive(Default)]
pub struct MemoryTraceSink {
    traces: Mutex<Vec<ComparisonTrace>>,
}

impl MemoryTraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn traces(&self) -> Vec<ComparisonTrace> {
        self.traces
            .lock()
            .map(|traces| traces.clone())
            .unwrap_or_default()
    }
}

impl TraceSink for MemoryTraceSink {
    fn record(&self, trace: ComparisonTrace) -> Result<(), TraceError> {
        if let Ok(mut traces) = self.traces.lock() {
            traces.push(trace);
        }
        Ok(())
    }
}

/// JSON-lines sink. Traces are encoded on the caller's thread and written
/// by a dedicated writer thread.
#[derive(Clone)]
pub struct JsonlTraceSink {
    lines: mpsc::Sender<String>,
}

/// Owns the writer thread of a [`JsonlTraceSink`].
pub struct TraceWriterHandle<W> {
    thread: JoinHandle<std::io::Result<W>>,
}

impl<W> TraceWriterHandle<W> {
    /// Blocks until every queued line is written and flushed, then hands
    /// back the writer. Returns only after all sink clones are dropped.
    pub fn finish(self) -> Result<W, TraceError> {
        match self.thread.join() {
            Ok(written) => Ok(written?),
            Err(_) => Err(TraceError::WriterPanicked),
        }
    }
}

impl JsonlTraceSink {
    /// Truncates or creates `path`.
    pub fn create(
        path: impl AsRef<Path>,
    ) -> Result<(Self, TraceWriterHandle<BufWriter<File>>), TraceError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| TraceError::Create {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::spawn(BufWriter::new(file)))
    }

    pub fn spawn<W: Write + Send + 'static>(writer: W) -> (Self, TraceWriterHandle<W>) {
        let (lines, queue) = mpsc::channel::<String>();
        let thread = std::thread::spawn(move || drain_lines(writer, queue));
        (Self { lines }, TraceWriterHandle { thread })
    }
}

impl TraceSink for JsonlTraceSink {
    fn record(&self, trace: ComparisonTrace) -> Result<(), TraceError> {
        let line = serde_json::to_string(&trace)?;
        self.lines.send(line).map_err(|_| TraceError::WriterStopped)
    }
}

fn drain_lines<W: Write>(mut writer: W, queue: mpsc::Receiver<String>) -> std::io::Result<W> {
    while let Ok(line) = queue.recv() {
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(writer)
}

/// blake3 hex digest of a document body.
pub fn content_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}
