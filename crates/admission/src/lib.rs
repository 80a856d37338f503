//! # Admission
//!
//! Per-channel numeric range filtering of ingested records.
//!
//! A [`RangeFilter`] tests one named field against an inclusive range; a
//! [`FilterSet`] evaluates all configured filters as a conjunction and is
//! read-only once the bridge starts. Filters usually come from a definition
//! file, see [`load_filter_file`].

mod file;
mod filter;
mod set;

pub use file::{load_filter_file, parse_filter_lines};
pub use filter::RangeFilter;
pub use set::FilterSet;
