//! Record store errors

use std::path::PathBuf;

use thiserror::Error;

use crate::dataset::RecordId;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Input is missing a required column or has rows wider than its header.
    #[error("format error: {0}")]
    Format(String),

    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Flush failed; the last good checkpoint on disk is still intact.
    #[error("cannot persist dataset to {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("record {0} does not exist")]
    UnknownRecord(RecordId),
}

impl StoreError {
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_display_names_path() {
        let err = StoreError::Persistence {
            path: PathBuf::from("/data/news.csv"),
            source: std::io::Error::other("disk full"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/data/news.csv"));
        assert!(msg.contains("disk full"));
        assert!(err.is_persistence());
    }

    #[test]
    fn format_is_not_persistence() {
        let err = StoreError::Format("missing column \"text\"".into());
        assert!(!err.is_persistence());
        assert!(err.to_string().starts_with("format error"));
    }
}
