// src/handlers/error.rs
use std::fmt;
use warp::http::StatusCode;
use warp::reject::Reject;

use crate::error::{ReportError, SnapshotError, ValuationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    DataUnavailable,
    Computation,
    Conflict,
    Internal,
}

#[derive(Debug, Clone)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ApiError {
            kind,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::DataUnavailable => StatusCode::NOT_FOUND,
            ErrorKind::Computation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}
impl Reject for ApiError {}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        let kind = match err {
            ReportError::InvalidTicker { .. } => ErrorKind::Validation,
            ReportError::NoData(_) => ErrorKind::DataUnavailable,
            ReportError::Fetch(_) | ReportError::Page(_) | ReportError::Store(_) => {
                ErrorKind::Internal
            }
        };
        ApiError::new(kind, err.to_string())
    }
}

impl From<ValuationError> for ApiError {
    fn from(err: ValuationError) -> Self {
        let kind = if err.is_input_error() {
            ErrorKind::Validation
        } else {
            ErrorKind::Computation
        };
        ApiError::new(kind, err.to_string())
    }
}

impl From<SnapshotError> for ApiError {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::Report(e) => e.into(),
            SnapshotError::Valuation(e) => e.into(),
            SnapshotError::Store(e) => ApiError::new(ErrorKind::Internal, e.to_string()),
            SnapshotError::NotLive => {
                ApiError::new(ErrorKind::Validation, SnapshotError::NotLive.to_string())
            }
            SnapshotError::AlreadySaved(link) => ApiError::new(
                ErrorKind::Conflict,
                SnapshotError::AlreadySaved(link).to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_error_class() {
        let invalid: ApiError = ReportError::InvalidTicker {
            ticker: "ZZZZ".into(),
            exchanges: "NYSE".into(),
        }
        .into();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let missing: ApiError = ReportError::NoData("AAPL".into()).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let computation: ApiError = ValuationError::computation("bad").into();
        assert_eq!(computation.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(computation.message, "check your inputs: bad");

        let input: ApiError = SnapshotError::from(ValuationError::MissingInput { field: "cash" }).into();
        assert_eq!(input.status(), StatusCode::BAD_REQUEST);

        let not_live: ApiError = SnapshotError::NotLive.into();
        assert_eq!(not_live.kind, ErrorKind::Validation);

        let saved: ApiError = SnapshotError::AlreadySaved("/apps/dcf/AAPL/x".into()).into();
        assert_eq!(saved.status(), StatusCode::CONFLICT);
        assert!(saved.message.contains("/apps/dcf/AAPL/x"));
    }
}
