//! Failure taxonomy for TMDB requests.
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TmdbError {
    #[error("request to {path} could not complete: {source}")]
    Network {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("TMDB returned {status} for {path}: {body}")]
    Api {
        path: String,
        status: StatusCode,
        body: String,
    },
    #[error("TMDB has no resource at {path}")]
    NotFound { path: String },
    #[error("malformed TMDB payload from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Coarse classification used by controllers when reporting a failed settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Network,
    Api,
    NotFound,
}

impl FailureKind {
    pub fn classify(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<TmdbError>() {
            Some(TmdbError::NotFound { .. }) => FailureKind::NotFound,
            Some(TmdbError::Api { .. }) | Some(TmdbError::Decode { .. }) => FailureKind::Api,
            Some(TmdbError::Network { .. }) | None => FailureKind::Network,
        }
    }
}
