//! Multiplexed execution of several query specifications.
//!
//! A [`BatchQuery`] snapshots the wire request of each constituent cursor
//! at build time (dataset id, current absolute offset, one page of rows)
//! and sends them all in a single round-trip. Responses come back in
//! request order, unprocessed; nothing is re-assembled into cursors.

use crate::query::Query;
use crate::source::{BatchRequest, DataSource, QueryRequest, QueryResponse};
use crate::{Error, Result};
use std::sync::Arc;

pub struct BatchQuery {
    source: Arc<dyn DataSource>,
    requests: Vec<QueryRequest>,
}

impl BatchQuery {
    /// Snapshot the given cursors into one batch.
    ///
    /// The batch shares nothing mutable with the cursors afterwards:
    /// changes to a cursor after this call do not affect the batch.
    pub fn new(queries: &[Query]) -> Result<Self> {
        let first = queries.first().ok_or_else(|| {
            Error::InvalidParameter("a batch requires at least one query".to_string())
        })?;
        Ok(BatchQuery {
            source: first.source_handle(),
            requests: queries.iter().map(Query::batch_request).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// The snapshotted wire requests, in order.
    pub fn requests(&self) -> &[QueryRequest] {
        &self.requests
    }

    /// Send every query in one request; per-query responses in order.
    pub fn execute(&self) -> Result<Vec<QueryResponse>> {
        tracing::debug!(queries = self.requests.len(), "executing batch query");
        let response = self.source.batch_query(&BatchRequest {
            queries: self.requests.clone(),
        })?;
        Ok(response.responses)
    }
}
