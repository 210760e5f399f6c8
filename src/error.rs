// src/error.rs
use thiserror::Error;

/// A cell whose text is neither a number, a unit-suffixed number nor a dash.
#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    #[error("empty cell")]
    Empty,
    #[error("malformed numeric cell: {0:?}")]
    Malformed(String),
    #[error("unsupported cell value: {0}")]
    Unsupported(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timed out after {0}s fetching {1}")]
    Timeout(u64, String),
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Failures of the ingestion path.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Invalid Ticker entered: {ticker}\nValid Tickers from listed Exchanges:\n{exchanges}")]
    InvalidTicker { ticker: String, exchanges: String },
    #[error("Data not found for Ticker: {0}")]
    NoData(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("could not read page: {0}")]
    Page(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures of the projector and cost-of-capital computation.
#[derive(Debug, Error, PartialEq)]
pub enum ValuationError {
    #[error("missing required input: {field}")]
    MissingInput { field: &'static str },
    #[error("invalid input {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },
    #[error("check your inputs: {0}")]
    Computation(String),
}

impl ValuationError {
    pub fn computation(reason: impl Into<String>) -> Self {
        ValuationError::Computation(reason.into())
    }

    /// True for the input-shaped failures the caller renders as a targeted message.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ValuationError::MissingInput { .. } | ValuationError::InvalidInput { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Valuation(#[from] ValuationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("snapshots can only be saved in live mode")]
    NotLive,
    #[error("snapshot {0} is already saved; start a new one to save again")]
    AlreadySaved(String),
}
