//! Streams newline-delimited JSON documents through a map function.

use std::io::{BufRead, Write};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;
use tracing::{debug, warn};
use view_map::{JsMapFunction, MapError, Value, ViewRow};

/// Where a document's identifier comes from.
#[derive(Debug, Clone)]
pub struct IdSource {
    /// Top-level field holding the identifier.
    pub field: String,
}

impl IdSource {
    /// The document's identifier, or its 1-based line number when the field
    /// is missing or not a string or number.
    pub fn identify(&self, document: &Value, line: usize) -> String {
        match document.get(&self.field) {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(n)) => format!("{n}"),
            _ => line.to_string(),
        }
    }
}

/// Counters reported after a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexSummary {
    /// Non-blank input lines.
    pub documents: usize,
    pub rows: usize,
    /// Lines that were not valid JSON.
    pub invalid: usize,
    /// Documents whose map call threw.
    pub failed: usize,
}

impl IndexSummary {
    pub fn errors(&self) -> usize {
        self.invalid + self.failed
    }
}

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Failed to read input line {0}: {1}")]
    Read(usize, #[source] std::io::Error),

    #[error("Failed to write output: {0}")]
    Write(#[source] std::io::Error),

    #[error("Failed to encode row: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Map(#[from] MapError),
}

#[derive(Default)]
struct Counters {
    documents: AtomicUsize,
    rows: AtomicUsize,
    invalid: AtomicUsize,
    failed: AtomicUsize,
}

impl Counters {
    fn summary(&self) -> IndexSummary {
        IndexSummary {
            documents: self.documents.load(Ordering::Relaxed),
            rows: self.rows.load(Ordering::Relaxed),
            invalid: self.invalid.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Map every line of `input`, writing one JSON row per line to `output`.
///
/// Documents are spread over `workers` threads. Rows of one document are
/// written together in emit order; documents may finish out of input order
/// when `workers > 1`. Bad documents are counted and skipped; I/O failures
/// and a stopped engine end the run.
pub fn index<I, W>(
    mapper: &JsMapFunction,
    input: I,
    output: W,
    ids: &IdSource,
    workers: usize,
) -> Result<IndexSummary, IndexError>
where
    I: BufRead + Send,
    W: Write + Send,
{
    let lines = Mutex::new(input.lines().enumerate());
    let output = Mutex::new(output);
    let counters = Counters::default();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers.max(1))
            .map(|_| scope.spawn(|| worker(mapper, &lines, &output, ids, &counters)))
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect::<Result<Vec<()>, IndexError>>()
    })?;

    output
        .into_inner()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .flush()
        .map_err(IndexError::Write)?;
    Ok(counters.summary())
}

fn worker<L, W>(
    mapper: &JsMapFunction,
    lines: &Mutex<L>,
    output: &Mutex<W>,
    ids: &IdSource,
    counters: &Counters,
) -> Result<(), IndexError>
where
    L: Iterator<Item = (usize, std::io::Result<String>)>,
    W: Write,
{
    loop {
        let next = lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .next();
        let Some((index, line)) = next else {
            return Ok(());
        };
        let number = index + 1;
        let line = line.map_err(|e| IndexError::Read(number, e))?;
        if line.trim().is_empty() {
            continue;
        }
        counters.documents.fetch_add(1, Ordering::Relaxed);

        let document = match Value::from_json_str(&line) {
            Ok(document) => document,
            Err(e) => {
                warn!(line = number, error = %e, "skipping document");
                counters.invalid.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };
        let id = ids.identify(&document, number);

        match mapper.call_document(&document, &id) {
            Ok(rows) => {
                debug!(id = %id, rows = rows.len(), "document indexed");
                counters.rows.fetch_add(rows.len(), Ordering::Relaxed);
                write_rows(output, &rows)?;
            }
            Err(e) if e.is_document_error() => {
                warn!(id = %id, line = number, error = %e, "map function failed");
                counters.failed.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn write_rows<W: Write>(output: &Mutex<W>, rows: &[ViewRow]) -> Result<(), IndexError> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut buffer = Vec::new();
    for row in rows {
        serde_json::to_writer(&mut buffer, row)?;
        buffer.push(b'\n');
    }
    output
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .write_all(&buffer)
        .map_err(IndexError::Write)
}
