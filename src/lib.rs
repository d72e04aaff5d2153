pub mod annotate;
pub mod batch;
pub mod config;
pub mod error;
pub mod filter;
pub mod genomic;
pub mod jobs;
pub mod query;
pub mod source;

pub use batch::BatchQuery;
pub use config::Config;
pub use error::{Error, Result};
pub use filter::Filter;
pub use genomic::GenomicFilter;
pub use query::Query;
pub use source::{DataSource, HttpDataSource, Record};
