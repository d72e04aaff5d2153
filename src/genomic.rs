//! Genomic range filters over chromosome coordinates.
//!
//! A [`GenomicFilter`] translates a chromosome/start/stop triple into a
//! [`Filter`] tree against the `genomic_coordinates.*` fields. By default it
//! matches any record whose coordinate interval overlaps the query interval;
//! with `exact` set, only records with identical boundaries match.

use crate::filter::Filter;
use crate::{Error, Result};
use serde_json::{Value, json};

const FIELD_CHROMOSOME: &str = "genomic_coordinates.chromosome";
const FIELD_START: &str = "genomic_coordinates.start";
const FIELD_STOP: &str = "genomic_coordinates.stop";
const FIELD_START_LTE: &str = "genomic_coordinates.start__lte";
const FIELD_STOP_GTE: &str = "genomic_coordinates.stop__gte";
const FIELD_START_RANGE: &str = "genomic_coordinates.start__range";
const FIELD_STOP_RANGE: &str = "genomic_coordinates.stop__range";

/// A chromosome/start/stop query, convertible into a [`Filter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomicFilter {
    chromosome: Option<String>,
    start: u64,
    stop: u64,
    exact: bool,
}

impl GenomicFilter {
    /// Filter for a range of positions on a chromosome.
    ///
    /// A leading `chr` prefix on the chromosome is stripped before
    /// comparison; `None` matches records with no chromosome.
    pub fn range(chromosome: Option<&str>, start: u64, stop: u64, exact: bool) -> Self {
        GenomicFilter {
            chromosome: chromosome.map(normalize_chromosome),
            start,
            stop,
            exact,
        }
    }

    /// Filter for a single-base position.
    pub fn position(chromosome: Option<&str>, pos: u64, exact: bool) -> Self {
        Self::range(chromosome, pos, pos, exact)
    }

    /// Parses a UCSC-style range string: `"chr2:1000-2000"` or `"chr2:1500"`.
    ///
    /// Thousands-separator commas in the positions are ignored.
    pub fn from_ucsc(string: &str, exact: bool) -> Result<Self> {
        let (chromosome, pos) = string.split_once(':').ok_or_else(|| {
            Error::InvalidRange(format!(
                "expected UCSC-style format \"chr2:1000-2000\", got \"{string}\""
            ))
        })?;

        if chromosome.is_empty() {
            return Err(Error::InvalidRange(format!(
                "missing chromosome in \"{string}\""
            )));
        }

        let pos = pos.replace(',', "");
        let (start, stop) = match pos.split_once('-') {
            Some((start, stop)) => (parse_position(start)?, parse_position(stop)?),
            None => {
                let p = parse_position(&pos)?;
                (p, p)
            }
        };

        Ok(Self::range(Some(chromosome), start, stop, exact))
    }

    pub fn chromosome(&self) -> Option<&str> {
        self.chromosome.as_deref()
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn stop(&self) -> u64 {
        self.stop
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }

    /// Lowers the range into a filter tree.
    pub fn to_filter(&self) -> Filter {
        let coordinates = if self.exact {
            Filter::from_terms([(FIELD_START, json!(self.start)), (FIELD_STOP, json!(self.stop))])
        } else if self.start == self.stop {
            // single position: any record interval containing it
            Filter::from_terms([
                (FIELD_START_LTE, json!(self.start)),
                (FIELD_STOP_GTE, json!(self.stop)),
            ])
        } else {
            // overlap: the record contains the query range, or either record
            // boundary falls inside it
            let span = json!([self.start, self.stop]);
            let contains = Filter::from_terms([
                (FIELD_START_LTE, json!(self.start)),
                (FIELD_STOP_GTE, json!(self.stop)),
            ]);
            contains
                | Filter::term(FIELD_START_RANGE, span.clone())
                | Filter::term(FIELD_STOP_RANGE, span)
        };

        let chromosome = match &self.chromosome {
            Some(c) => Value::String(c.clone()),
            None => Value::Null,
        };

        coordinates & Filter::term(FIELD_CHROMOSOME, chromosome)
    }
}

impl From<GenomicFilter> for Filter {
    fn from(range: GenomicFilter) -> Filter {
        range.to_filter()
    }
}

fn normalize_chromosome(chromosome: &str) -> String {
    chromosome
        .strip_prefix("chr")
        .unwrap_or(chromosome)
        .to_string()
}

fn parse_position(s: &str) -> Result<u64> {
    s.parse()
        .map_err(|_| Error::InvalidRange(format!("non-numeric position \"{s}\"")))
}
