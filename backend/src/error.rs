use axum::http::StatusCode;
use thiserror::Error;

use crate::{aggregate::AggregateError, engine::PathError, geocode::GeocodeError};

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("No route found between these points.")]
    NoRoute,
    #[error("could not resolve location: {0}")]
    Geocode(#[from] GeocodeError),
    #[error("graph lookup failed: {0}")]
    Graph(#[from] crate::aggregate::GraphError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl RouteError {
    pub fn status(&self) -> StatusCode {
        match self {
            RouteError::NoRoute => StatusCode::NOT_FOUND,
            RouteError::Geocode(_) | RouteError::Graph(_) | RouteError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Unsnappable endpoints and disconnected graphs both read as "no route" to callers.
impl From<PathError> for RouteError {
    fn from(err: PathError) -> Self {
        tracing::debug!("path finding failed: {err}");
        RouteError::NoRoute
    }
}

impl From<AggregateError> for RouteError {
    fn from(err: AggregateError) -> Self {
        match err {
            AggregateError::NoRoute => RouteError::NoRoute,
            AggregateError::Graph(err) => RouteError::Graph(err),
        }
    }
}
