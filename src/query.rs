//! Lazy, paginated query cursors.
//!
//! A [`Query`] wraps a remote paged data source and presents list-like
//! access to the full result set: length, indexing, slicing and iteration
//! all work against a server-side result that may be far larger than one
//! page. Pages are fetched on demand; the cursor keeps exactly one page
//! buffered at a time and re-fetches when access moves outside it.
//!
//! Cursors are cheap to derive: [`Query::filter`], [`Query::limit`],
//! [`Query::range`] and [`Query::slice`] all return a new cursor with the
//! combined configuration and no fetched state. Derived cursors never share
//! buffers with their parent, so each can be handed to a different thread.
//!
//! ```no_run
//! use std::sync::Arc;
//! use genobase::source::HttpDataSource;
//! use genobase::{Filter, Query};
//!
//! # fn main() -> genobase::Result<()> {
//! let source = Arc::new(HttpDataSource::from_env()?);
//! let mut query = Query::new(source, "clinvar-variants")
//!     .genome_build("GRCh38")
//!     .filter(Filter::term("gene_symbol", "BRCA2"))
//!     .range(Some("chr13"), 32_315_000, 32_400_000, false);
//!
//! println!("{} matching variants", query.len()?);
//! for record in query.iter() {
//!     let record = record?;
//! }
//! # Ok(())
//! # }
//! ```

use crate::annotate::{Annotated, RecordAnnotator};
use crate::filter::Filter;
use crate::genomic::GenomicFilter;
use crate::jobs::{BulkJob, BulkJobs, ExportRequest, Follow, JobParams, MigrationRequest};
use crate::source::{DataSource, QueryRequest, QueryResponse, Record};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::fmt;
use std::sync::Arc;

/// Rows fetched per request unless overridden.
pub const DEFAULT_PAGE_SIZE: u64 = 100;

/// Upper bound on the server page size.
pub const MAX_PAGE_SIZE: u64 = 1000;

/// Absolute half-open row window a derived cursor is restricted to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Window {
    start: u64,
    stop: Option<u64>,
}

/// Fetched state. Never copied into derived cursors.
#[derive(Debug, Clone, Default)]
struct CursorState {
    total: Option<u64>,
    buffer: Vec<Record>,
    buffer_offset: u64,
    error: Option<String>,
}

/// A lazy cursor over one dataset's filtered records.
pub struct Query {
    source: Arc<dyn DataSource>,
    dataset_id: String,
    search: Option<String>,
    filters: Vec<Filter>,
    fields: Option<Vec<String>>,
    exclude_fields: Option<Vec<String>>,
    entities: Option<Vec<(String, String)>>,
    ordering: Option<Vec<String>>,
    genome_build: Option<String>,
    debug: bool,
    limit: Option<u64>,
    page_size: u64,
    window: Window,
    state: CursorState,
}

impl Query {
    /// New unbounded cursor over `dataset_id`, with the default page size
    /// and no filters.
    pub fn new(source: Arc<dyn DataSource>, dataset_id: impl Into<String>) -> Self {
        Query {
            source,
            dataset_id: dataset_id.into(),
            search: None,
            filters: Vec::new(),
            fields: None,
            exclude_fields: None,
            entities: None,
            ordering: None,
            genome_build: None,
            debug: false,
            limit: None,
            page_size: DEFAULT_PAGE_SIZE,
            window: Window::default(),
            state: CursorState::default(),
        }
    }

    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    // --- construction-time configuration ---

    /// Free-text query string (advanced search).
    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.search = Some(query.into());
        self
    }

    /// Restrict returned records to these fields.
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Drop these fields from returned records.
    pub fn exclude_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Filter on `(entity type, entity id)` pairs.
    pub fn entities<I, K, V>(mut self, entities: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.entities = Some(
            entities
                .into_iter()
                .map(|(kind, id)| (kind.into(), id.into()))
                .collect(),
        );
        self
    }

    /// Order results by these fields (`-field` for descending).
    pub fn order_by<I, S>(mut self, ordering: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ordering = Some(ordering.into_iter().map(Into::into).collect());
        self
    }

    pub fn genome_build(mut self, build: impl Into<String>) -> Self {
        self.genome_build = Some(build.into());
        self
    }

    /// Ask the server to include debug information with each response.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Rows fetched per request. Must be in `[1, 1000]`.
    pub fn page_size(mut self, page_size: u64) -> Result<Self> {
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(Error::InvalidParameter(format!(
                "'page_size' must be in range [1, {MAX_PAGE_SIZE}], got {page_size}"
            )));
        }
        self.page_size = page_size;
        Ok(self)
    }

    // --- cursor derivation ---

    /// Configuration copy with no fetched state.
    fn derive(&self) -> Query {
        Query {
            source: Arc::clone(&self.source),
            dataset_id: self.dataset_id.clone(),
            search: self.search.clone(),
            filters: self.filters.clone(),
            fields: self.fields.clone(),
            exclude_fields: self.exclude_fields.clone(),
            entities: self.entities.clone(),
            ordering: self.ordering.clone(),
            genome_build: self.genome_build.clone(),
            debug: self.debug,
            limit: self.limit,
            page_size: self.page_size,
            window: Window::default(),
            state: CursorState::default(),
        }
    }

    /// New cursor with `filter` ANDed onto the existing operands.
    pub fn filter(&self, filter: impl Into<Filter>) -> Query {
        let mut query = self.derive();
        query.filters.push(filter.into());
        query
    }

    /// New cursor with the given `(field, value)` terms ANDed on, matching
    /// [`Filter::from_terms`] semantics.
    pub fn filter_terms<I, K, V>(&self, terms: I) -> Query
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.filter(Filter::from_terms(terms))
    }

    /// New cursor capped at `limit` records client-side.
    ///
    /// `0` is valid and makes the cursor empty without suppressing
    /// [`Query::count`]. Negative values are rejected.
    pub fn limit(&self, limit: i64) -> Result<Query> {
        if limit < 0 {
            return Err(Error::InvalidParameter(format!(
                "'limit' must be >= 0, got {limit}"
            )));
        }
        let mut query = self.derive();
        query.limit = Some(limit as u64);
        Ok(query)
    }

    /// New cursor additionally filtered to a genomic range.
    pub fn range(&self, chromosome: Option<&str>, start: u64, stop: u64, exact: bool) -> Query {
        self.filter(GenomicFilter::range(chromosome, start, stop, exact))
    }

    /// New cursor additionally filtered to a single genomic position.
    pub fn position(&self, chromosome: Option<&str>, pos: u64, exact: bool) -> Query {
        self.filter(GenomicFilter::position(chromosome, pos, exact))
    }

    /// New cursor restricted to rows `[start, stop)` of this cursor's view.
    ///
    /// Bounds are relative to (and clipped against) any window already
    /// active on `self`; the derived cursor's limit is `min(stop - start,
    /// parent limit)`. A start at or past the parent's stop produces an
    /// empty cursor that answers length 0 without a request.
    pub fn slice(&self, start: i64, stop: Option<i64>) -> Result<Query> {
        if start < 0 || stop.is_some_and(|s| s < 0) {
            return Err(Error::InvalidParameter(
                "negative slice bounds are not supported".to_string(),
            ));
        }
        let start = start as u64;
        let stop = stop.map(|s| s as u64);
        if let Some(stop) = stop {
            if stop < start {
                return Err(Error::InvalidParameter(format!(
                    "slice stop {stop} precedes start {start}"
                )));
            }
        }

        let start_abs = self.window.start + start;
        let mut stop_abs = stop.map(|s| self.window.start + s);
        if let Some(parent_stop) = self.window.stop {
            stop_abs = Some(match stop_abs {
                Some(s) => s.min(parent_stop),
                None => parent_stop,
            });
        }

        let mut query = self.derive();
        query.window = Window {
            start: start_abs,
            stop: stop_abs,
        };
        let span = stop_abs.map(|s| s.saturating_sub(start_abs));
        query.limit = match (span, self.limit) {
            (Some(span), Some(limit)) => Some(span.min(limit)),
            (Some(span), None) => Some(span),
            (None, limit) => limit,
        };
        Ok(query)
    }

    // --- fetch machinery ---

    /// Smallest known bound on the number of accessible rows, before asking
    /// the server. `None` means unbounded.
    fn cap(&self) -> Option<u64> {
        let span = self.window.stop.map(|s| s.saturating_sub(self.window.start));
        match (self.limit, span) {
            (Some(limit), Some(span)) => Some(limit.min(span)),
            (Some(limit), None) => Some(limit),
            (None, span) => span,
        }
    }

    /// Rows accessible through this cursor once the remote total is known.
    fn effective_len(&self, total: u64) -> u64 {
        let available = total.saturating_sub(self.window.start);
        match self.cap() {
            Some(cap) => cap.min(available),
            None => available,
        }
    }

    /// Page limit for a fetch starting at absolute `position`.
    fn page_limit_at(&self, position: u64) -> u64 {
        let mut page = self.page_size;
        if let Some(cap) = self.cap() {
            let stop = self.window.start + cap;
            page = page.min(stop.saturating_sub(position));
        }
        if let Some(total) = self.state.total {
            page = page.min(total.saturating_sub(position));
        }
        page
    }

    fn raise_captured(&self) -> Result<()> {
        match &self.state.error {
            Some(message) => Err(Error::RemoteQuery(message.clone())),
            None => Ok(()),
        }
    }

    fn capture(&mut self, error: Error) -> Error {
        self.state.error = Some(match &error {
            Error::RemoteQuery(message) => message.clone(),
            other => other.to_string(),
        });
        error
    }

    /// One round-trip, leaving the page buffer untouched. Used for index
    /// probes and facets so they do not evict the iteration page.
    fn fetch_detached(
        &mut self,
        offset: u64,
        limit: u64,
        facets: Option<Value>,
    ) -> Result<QueryResponse> {
        self.raise_captured()?;
        let mut request = self.build_request(offset, limit);
        request.facets = facets;
        tracing::debug!(
            dataset = %self.dataset_id,
            offset,
            limit,
            "executing query"
        );
        match self.source.query(&self.dataset_id, &request) {
            Ok(response) => {
                self.state.total = Some(response.total);
                Ok(response)
            }
            Err(e) => Err(self.capture(e)),
        }
    }

    /// One round-trip that replaces the page buffer with the fetched page.
    fn fetch_page(&mut self, offset: u64) -> Result<()> {
        let limit = self.page_limit_at(offset);
        let response = self.fetch_detached(offset, limit, None)?;
        self.state.buffer = response.results;
        self.state.buffer_offset = offset;
        Ok(())
    }

    /// Fetch the first page (and the remote total) if nothing is buffered
    /// yet. Re-raises any error captured by an earlier fetch.
    fn ensure_warm(&mut self) -> Result<()> {
        self.raise_captured()?;
        if self.state.total.is_none() {
            tracing::debug!(dataset = %self.dataset_id, "warming up cursor");
            self.fetch_page(self.window.start)?;
        }
        Ok(())
    }

    fn buffer_covers(&self, position: u64) -> bool {
        !self.state.buffer.is_empty()
            && position >= self.state.buffer_offset
            && position < self.state.buffer_offset + self.state.buffer.len() as u64
    }

    // --- list-like access ---

    /// Remote total matching the filters, ignoring any client-side limit.
    pub fn count(&mut self) -> Result<u64> {
        self.ensure_warm()?;
        Ok(self.state.total.unwrap_or(0))
    }

    /// Number of records accessible through this cursor:
    /// `min(limit, count)` within the active window.
    pub fn len(&mut self) -> Result<u64> {
        if self.cap() == Some(0) {
            return Ok(0);
        }
        let total = self.count()?;
        Ok(self.effective_len(total))
    }

    pub fn is_empty(&mut self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// The record at `index`, counted from the start of the active window.
    ///
    /// Served from the buffered page when covered; otherwise a single-row
    /// fetch at the absolute offset. Negative indices are rejected, and an
    /// index at or past [`Query::len`] is out of range.
    pub fn get(&mut self, index: i64) -> Result<Record> {
        if index < 0 {
            return Err(Error::InvalidParameter(
                "negative indexing is not supported".to_string(),
            ));
        }
        let index = index as u64;
        let len = self.len()?;
        if index >= len {
            return Err(Error::IndexOutOfRange(format!(
                "index {index} beyond query length {len}"
            )));
        }

        let absolute = self.window.start + index;
        if self.buffer_covers(absolute) {
            let at = (absolute - self.state.buffer_offset) as usize;
            return Ok(self.state.buffer[at].clone());
        }

        let response = self.fetch_detached(absolute, 1, None)?;
        response.results.into_iter().next().ok_or_else(|| {
            Error::IndexOutOfRange(format!("no record at offset {absolute}"))
        })
    }

    /// Iterate the full result set, fetching page by page.
    ///
    /// Iteration always restarts from the beginning of the active window
    /// with a fresh fetch sequence, even on a warm cursor.
    pub fn iter(&mut self) -> Records<'_> {
        self.state.buffer.clear();
        self.state.total = None;
        let position = self.window.start;
        Records {
            query: self,
            position,
            done: false,
        }
    }

    /// Materialize every record.
    pub fn records(&mut self) -> Result<Vec<Record>> {
        self.iter().collect()
    }

    /// Materialize every record into `T`.
    pub fn records_as<T: DeserializeOwned>(&mut self) -> Result<Vec<T>> {
        self.iter()
            .map(|record| {
                record.and_then(|record| {
                    serde_json::from_value(Value::Object(record)).map_err(|e| {
                        Error::RemoteQuery(format!("record does not match target type: {e}"))
                    })
                })
            })
            .collect()
    }

    // --- derived operations ---

    /// Per-field aggregations over the filtered result set.
    ///
    /// Sends a `limit = 0` request carrying the facet specification and
    /// returns the server's mapping untouched. At least one field is
    /// required.
    pub fn facets(&mut self, fields: &[&str]) -> Result<Map<String, Value>> {
        let spec: Map<String, Value> = fields
            .iter()
            .map(|field| (field.to_string(), json!({})))
            .collect();
        self.facets_with(spec)
    }

    /// Facets with per-field options (e.g. `{"gene_symbol": {"limit": 10}}`).
    pub fn facets_with(&mut self, spec: Map<String, Value>) -> Result<Map<String, Value>> {
        if spec.is_empty() {
            return Err(Error::InvalidParameter(
                "faceting requires at least one field".to_string(),
            ));
        }
        let response = self.fetch_detached(0, 0, Some(Value::Object(spec)))?;
        Ok(response.facets.unwrap_or_default())
    }

    /// The filter/field/limit configuration a bulk job consumes. Pagination
    /// parameters (offset, ordering) are stripped.
    fn job_params(&self) -> JobParams {
        JobParams {
            query: self.search.clone(),
            filters: self.wire_filters(),
            fields: self.fields.clone(),
            exclude_fields: self.exclude_fields.clone(),
            genome_build: self.genome_build.clone(),
            limit: self.limit,
        }
    }

    /// Start a bulk export of this cursor's result set.
    ///
    /// Refuses to export an empty result set. With `follow` set, blocks
    /// polling the job until it reaches a terminal status.
    pub fn export(&mut self, jobs: &dyn BulkJobs, follow: Option<Follow>) -> Result<Box<dyn BulkJob>> {
        if self.is_empty()? {
            return Err(Error::NoResults(format!(
                "nothing to export from dataset {}",
                self.dataset_id
            )));
        }
        let request = ExportRequest {
            dataset: self.dataset_id.clone(),
            params: self.job_params(),
        };
        let job = jobs.create_export(&request)?;
        tracing::info!(job = job.id(), dataset = %self.dataset_id, "export started");
        if let Some(follow) = follow {
            job.follow(follow)?;
        }
        Ok(job)
    }

    /// Start a bulk copy of this cursor's result set into `target`.
    pub fn migrate(
        &mut self,
        jobs: &dyn BulkJobs,
        target: &str,
        follow: Option<Follow>,
    ) -> Result<Box<dyn BulkJob>> {
        if self.is_empty()? {
            return Err(Error::NoResults(format!(
                "nothing to migrate from dataset {}",
                self.dataset_id
            )));
        }
        let request = MigrationRequest {
            source: self.dataset_id.clone(),
            target: target.to_string(),
            params: self.job_params(),
        };
        let job = jobs.create_migration(&request)?;
        tracing::info!(
            job = job.id(),
            source = %self.dataset_id,
            target,
            "migration started"
        );
        if let Some(follow) = follow {
            job.follow(follow)?;
        }
        Ok(job)
    }

    /// Stream every record through `annotator` in batches of `chunk_size`
    /// (conventionally [`DEFAULT_CHUNK_SIZE`](crate::annotate::DEFAULT_CHUNK_SIZE)).
    pub fn annotate<'a>(
        &'a mut self,
        annotator: &'a dyn RecordAnnotator,
        fields: Map<String, Value>,
        chunk_size: usize,
    ) -> Result<Annotated<'a>> {
        if chunk_size == 0 {
            return Err(Error::InvalidParameter(
                "'chunk_size' must be >= 1".to_string(),
            ));
        }
        Ok(Annotated::new(self.iter(), annotator, fields, chunk_size))
    }

    // --- wire building ---

    /// Lowered filter operands, with an implicit top-level `and` when more
    /// than one clause remains.
    fn wire_filters(&self) -> Option<Vec<Value>> {
        let mut clauses: Vec<Value> = Vec::new();
        for filter in &self.filters {
            clauses.extend(filter.to_wire());
        }
        match clauses.len() {
            0 => None,
            1 => Some(clauses),
            _ => Some(vec![json!({ "and": clauses })]),
        }
    }

    fn build_request(&self, offset: u64, limit: u64) -> QueryRequest {
        QueryRequest {
            query: self.search.clone(),
            filters: self.wire_filters(),
            fields: self.fields.clone(),
            exclude_fields: self.exclude_fields.clone(),
            entities: self.entities.clone(),
            ordering: self.ordering.clone(),
            genome_build: self.genome_build.clone(),
            debug: self.debug,
            facets: None,
            offset,
            limit,
            dataset: None,
        }
    }

    /// Wire request a batch snapshot carries for this cursor: its dataset
    /// id, current absolute offset, and one page worth of rows.
    pub(crate) fn batch_request(&self) -> QueryRequest {
        let offset = if self.state.buffer.is_empty() {
            self.window.start
        } else {
            self.state.buffer_offset
        };
        let limit = match self.cap() {
            Some(cap) => self.page_size.min(cap),
            None => self.page_size,
        };
        let mut request = self.build_request(offset, limit);
        request.dataset = Some(self.dataset_id.clone());
        request
    }

    pub(crate) fn source_handle(&self) -> Arc<dyn DataSource> {
        Arc::clone(&self.source)
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("dataset_id", &self.dataset_id)
            .field("search", &self.search)
            .field("filters", &self.filters)
            .field("limit", &self.limit)
            .field("page_size", &self.page_size)
            .field("window", &self.window)
            .field("warm", &self.state.total.is_some())
            .finish_non_exhaustive()
    }
}

/// Iterator over a cursor's records. Created by [`Query::iter`].
pub struct Records<'a> {
    query: &'a mut Query,
    position: u64,
    done: bool,
}

impl Iterator for Records<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.query.cap() == Some(0) {
            self.done = true;
            return None;
        }

        if self.query.state.total.is_none() {
            let position = self.position;
            if let Err(e) = self.query.fetch_page(position) {
                self.done = true;
                return Some(Err(e));
            }
        }

        let total = self.query.state.total.unwrap_or(0);
        let stop = self.query.window.start + self.query.effective_len(total);
        if self.position >= stop {
            self.done = true;
            return None;
        }

        if !self.query.buffer_covers(self.position) {
            let position = self.position;
            if let Err(e) = self.query.fetch_page(position) {
                self.done = true;
                return Some(Err(e));
            }
        }

        let at = (self.position - self.query.state.buffer_offset) as usize;
        match self.query.state.buffer.get(at) {
            Some(record) => {
                self.position += 1;
                Some(Ok(record.clone()))
            }
            None => {
                // server promised more rows than it returned
                self.done = true;
                Some(Err(Error::RemoteQuery(format!(
                    "empty page at offset {} with {} rows expected",
                    self.position,
                    stop - self.position
                ))))
            }
        }
    }
}

impl<'a> IntoIterator for &'a mut Query {
    type Item = Result<Record>;
    type IntoIter = Records<'a>;

    fn into_iter(self) -> Records<'a> {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{BatchRequest, BatchResponse};

    struct NullSource;

    impl DataSource for NullSource {
        fn query(&self, _dataset_id: &str, _request: &QueryRequest) -> Result<QueryResponse> {
            Ok(QueryResponse::default())
        }

        fn batch_query(&self, _request: &BatchRequest) -> Result<BatchResponse> {
            Ok(BatchResponse { responses: vec![] })
        }
    }

    fn query() -> Query {
        Query::new(Arc::new(NullSource), "ds-1")
    }

    #[test]
    fn test_limit_rejects_negative() {
        let err = query().limit(-1).unwrap_err();
        assert_eq!(err.error_type(), "InvalidParameter");
        assert!(query().limit(0).is_ok());
    }

    #[test]
    fn test_page_size_bounds() {
        assert!(query().page_size(1).is_ok());
        assert!(query().page_size(MAX_PAGE_SIZE).is_ok());
        for bad in [0, MAX_PAGE_SIZE + 1] {
            let err = query().page_size(bad).unwrap_err();
            assert_eq!(err.error_type(), "InvalidParameter");
        }
    }

    #[test]
    fn test_slice_rejects_negative_bounds() {
        assert_eq!(
            query().slice(-3, Some(5)).unwrap_err().error_type(),
            "InvalidParameter"
        );
        assert_eq!(
            query().slice(0, Some(-1)).unwrap_err().error_type(),
            "InvalidParameter"
        );
        assert_eq!(
            query().slice(5, Some(2)).unwrap_err().error_type(),
            "InvalidParameter"
        );
    }

    #[test]
    fn test_get_rejects_negative_index() {
        let err = query().get(-1).unwrap_err();
        assert_eq!(err.error_type(), "InvalidParameter");
    }

    #[test]
    fn test_slice_composes_windows() {
        let outer = query().slice(2, Some(8)).unwrap();
        assert_eq!(outer.window, Window { start: 2, stop: Some(8) });
        assert_eq!(outer.limit, Some(6));

        let inner = outer.slice(1, Some(3)).unwrap();
        assert_eq!(inner.window, Window { start: 3, stop: Some(5) });
        assert_eq!(inner.limit, Some(2));

        // clipped to the parent window
        let clipped = outer.slice(4, Some(100)).unwrap();
        assert_eq!(clipped.window, Window { start: 6, stop: Some(8) });
        assert_eq!(clipped.limit, Some(2));

        // start past the parent stop collapses to empty
        let empty = outer.slice(10, Some(12)).unwrap();
        assert_eq!(empty.limit, Some(0));
    }

    #[test]
    fn test_slice_keeps_parent_limit_when_tighter() {
        let limited = query().limit(3).unwrap();
        let sliced = limited.slice(0, Some(10)).unwrap();
        assert_eq!(sliced.limit, Some(3));
    }

    #[test]
    fn test_derived_cursor_resets_state() {
        let mut base = query();
        base.state.total = Some(10);
        base.state.buffer = vec![Record::new()];
        base.state.error = Some("boom".to_string());

        let derived = base.filter(Filter::term("gene_symbol", "BRCA2"));
        assert!(derived.state.total.is_none());
        assert!(derived.state.buffer.is_empty());
        assert!(derived.state.error.is_none());
    }

    #[test]
    fn test_single_filter_term_stays_bare_on_wire() {
        let q = query().filter(Filter::term("gene_symbol__in", json!(["BRCA1", "BRCA2"])));
        let request = q.build_request(0, 100);
        assert_eq!(
            request.filters,
            Some(vec![json!(["gene_symbol__in", ["BRCA1", "BRCA2"]])])
        );
    }

    #[test]
    fn test_multiple_operands_wrap_in_top_level_and() {
        let q = query()
            .filter(Filter::term("gene_symbol", "BRCA2"))
            .filter(Filter::term("clinical_significance", "Pathogenic"));
        let request = q.build_request(0, 100);
        assert_eq!(
            request.filters,
            Some(vec![json!({"and": [
                ["gene_symbol", "BRCA2"],
                ["clinical_significance", "Pathogenic"],
            ]})])
        );
    }

    #[test]
    fn test_empty_filters_left_off_the_wire() {
        let q = query().filter(Filter::new());
        assert_eq!(q.build_request(0, 100).filters, None);
    }

    #[test]
    fn test_build_request_carries_configuration() {
        let q = query()
            .search("kinase")
            .fields(["gene_symbol", "clinical_significance"])
            .order_by(["-genomic_coordinates.start"])
            .genome_build("GRCh38")
            .debug(true);
        let request = q.build_request(40, 20);

        assert_eq!(request.query.as_deref(), Some("kinase"));
        assert_eq!(
            request.fields,
            Some(vec![
                "gene_symbol".to_string(),
                "clinical_significance".to_string()
            ])
        );
        assert_eq!(
            request.ordering,
            Some(vec!["-genomic_coordinates.start".to_string()])
        );
        assert_eq!(request.genome_build.as_deref(), Some("GRCh38"));
        assert!(request.debug);
        assert_eq!(request.offset, 40);
        assert_eq!(request.limit, 20);
        assert_eq!(request.dataset, None);
    }

    #[test]
    fn test_batch_request_tags_dataset_and_caps_limit() {
        let q = query().limit(7).unwrap();
        let request = q.batch_request();
        assert_eq!(request.dataset.as_deref(), Some("ds-1"));
        assert_eq!(request.offset, 0);
        assert_eq!(request.limit, 7);

        let unbounded = query().batch_request();
        assert_eq!(unbounded.limit, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_job_params_strip_pagination() {
        let q = query()
            .search("kinase")
            .order_by(["gene_symbol"])
            .filter(Filter::term("gene_symbol", "BRCA2"))
            .limit(50)
            .unwrap();
        let params = serde_json::to_value(q.job_params()).unwrap();

        assert_eq!(params["query"], "kinase");
        assert_eq!(params["limit"], 50);
        assert_eq!(params["filters"], json!([["gene_symbol", "BRCA2"]]));
        assert!(params.get("ordering").is_none());
        assert!(params.get("offset").is_none());
    }
}
