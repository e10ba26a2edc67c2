//! newsenrich-store: the record store
//!
//! Owns the dataset of news records (a CSV file with a text column and a
//! result column) and is the only component allowed to read or mutate it.
//! Persistence is whole-file and atomic: every flush writes a temporary
//! sibling and renames it over the destination.

pub mod dataset;
pub mod error;

pub use dataset::{Columns, Dataset, RecordId};
pub use error::StoreError;
