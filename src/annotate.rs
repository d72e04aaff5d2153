//! Streaming record annotation.
//!
//! Runs a query's records through an external annotation service in
//! fixed-size batches, yielding annotated records one at a time so that
//! unbounded cursors stream in constant memory.

use crate::Result;
use crate::query::Records;
use crate::source::Record;
use serde_json::{Map, Value};
use std::collections::VecDeque;

/// Default number of records sent per annotation round-trip.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// External per-record annotation collaborator.
pub trait RecordAnnotator: Send + Sync {
    /// Annotate one batch of records with the given field expressions,
    /// returning them in order.
    fn annotate_batch(&self, records: Vec<Record>, fields: &Map<String, Value>)
    -> Result<Vec<Record>>;
}

/// Iterator over annotated records, produced by
/// [`Query::annotate`](crate::Query::annotate).
pub struct Annotated<'a> {
    records: Records<'a>,
    annotator: &'a dyn RecordAnnotator,
    fields: Map<String, Value>,
    chunk_size: usize,
    ready: VecDeque<Record>,
    done: bool,
}

impl<'a> Annotated<'a> {
    pub(crate) fn new(
        records: Records<'a>,
        annotator: &'a dyn RecordAnnotator,
        fields: Map<String, Value>,
        chunk_size: usize,
    ) -> Self {
        Annotated {
            records,
            annotator,
            fields,
            chunk_size,
            ready: VecDeque::new(),
            done: false,
        }
    }

    fn fill(&mut self) -> Option<Result<()>> {
        let mut chunk = Vec::with_capacity(self.chunk_size);
        while chunk.len() < self.chunk_size {
            match self.records.next() {
                Some(Ok(record)) => chunk.push(record),
                Some(Err(e)) => return Some(Err(e)),
                None => break,
            }
        }
        if chunk.is_empty() {
            return None;
        }
        match self.annotator.annotate_batch(chunk, &self.fields) {
            Ok(annotated) => {
                self.ready.extend(annotated);
                Some(Ok(()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

impl Iterator for Annotated<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.ready.pop_front() {
                return Some(Ok(record));
            }
            if self.done {
                return None;
            }
            match self.fill() {
                Some(Ok(())) => continue,
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    return None;
                }
            }
        }
    }
}
