//! Data source abstraction for remote paged queries.
//!
//! This module provides a trait-based abstraction over the query endpoint of
//! the data platform, allowing the HTTP backend to be swapped out for an
//! in-memory fake in tests. A [`Query`](crate::Query) holds its data source
//! as an explicit handle; there is no process-wide client.
//!
//! # Implementations
//!
//! - [`HttpDataSource`] - blocking HTTP backend

mod http;

pub use http::HttpDataSource;

use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single result row, as returned by the platform.
pub type Record = Map<String, Value>;

/// Wire-form query request.
///
/// Optional keys are omitted from the serialized object entirely rather
/// than sent as nulls; `offset` and `limit` are always present.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryRequest {
    /// Free-text query string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    /// Lowered filter tree; more than one top-level clause is wrapped in an
    /// implicit `and` before it gets here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<Value>>,

    /// Field allow-list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,

    /// Field exclude-list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_fields: Option<Vec<String>>,

    /// `(entity type, entity id)` pairs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<(String, String)>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordering: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub genome_build: Option<String>,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub debug: bool,

    /// Per-field facet specification (facet requests only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facets: Option<Value>,

    /// Absolute row offset of the requested page.
    pub offset: u64,

    /// Requested page size; `0` asks for the total without transferring rows.
    pub limit: u64,

    /// Target dataset id, set only inside a batch request where the path
    /// cannot carry it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
}

/// Wire-form query response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResponse {
    /// Authoritative number of records matching the filters, independent of
    /// any client-side limit.
    pub total: u64,

    #[serde(default)]
    pub results: Vec<Record>,

    /// Server-side execution time in milliseconds.
    #[serde(default)]
    pub took: Option<u64>,

    /// Per-field aggregations, present on facet requests.
    #[serde(default)]
    pub facets: Option<Map<String, Value>>,

    /// Opaque paging continuation token.
    #[serde(default)]
    pub scroll_id: Option<String>,
}

/// Multiplexed request: several tagged queries in one round-trip.
#[derive(Debug, Clone, Serialize)]
pub struct BatchRequest {
    pub queries: Vec<QueryRequest>,
}

/// Per-query responses, in request order.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub responses: Vec<QueryResponse>,
}

/// Remote query endpoint.
///
/// Implementations perform one blocking round-trip per call and do not
/// retry; retry/backoff policy belongs to the transport layer behind them.
pub trait DataSource: Send + Sync {
    /// Execute a single paged query against a dataset.
    fn query(&self, dataset_id: &str, request: &QueryRequest) -> Result<QueryResponse>;

    /// Execute several tagged queries as one multiplexed request.
    fn batch_query(&self, request: &BatchRequest) -> Result<BatchResponse>;
}
