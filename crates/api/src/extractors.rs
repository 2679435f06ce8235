//! Request extractors.
//!
//! Identifiers and ranges are validated here so handlers only see
//! well-formed queries. Missing identifiers map to `VALID_003`, bad ranges
//! to `VALID_002`.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use engine_core::{error::ValidationErrorCode, Error, ServiceKey};
use query::SeriesQuery;
use serde::Deserialize;

use crate::response::ApiError;

/// Header carrying the owning project on collection requests.
pub const PROJECT_ID_HEADER: &str = "X-Project-Id";

/// Project the request was made on behalf of.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    pub project_id: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for ProjectContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let project_id = parts
            .headers
            .get(PROJECT_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                Error::validation_code(
                    ValidationErrorCode::MissingIdentifier,
                    format!("{} header is required", PROJECT_ID_HEADER),
                )
            })?;

        Ok(ProjectContext {
            project_id: project_id.to_string(),
        })
    }
}

/// Query string as received; every field is optional so that validation
/// failures carry our own codes instead of a generic rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawParams {
    project_id: Option<String>,
    service_name: Option<String>,
    from: Option<String>,
    to: Option<String>,
}

impl RawParams {
    fn from_parts(parts: &Parts) -> Result<Self, Error> {
        Query::<RawParams>::try_from_uri(&parts.uri)
            .map(|Query(params)| params)
            .map_err(|e| Error::validation(e.to_string()))
    }

    fn service(&self) -> Result<ServiceKey, Error> {
        match (non_blank(&self.project_id), non_blank(&self.service_name)) {
            (Some(project_id), Some(service_name)) => Ok(ServiceKey::new(project_id, service_name)),
            _ => Err(Error::validation_code(
                ValidationErrorCode::MissingIdentifier,
                "projectId and serviceName are required",
            )),
        }
    }

    fn range(&self) -> Result<(i64, i64), Error> {
        let from = parse_millis("from", self.from.as_deref())?;
        let to = parse_millis("to", self.to.as_deref())?;
        if from > to {
            return Err(Error::validation_code(
                ValidationErrorCode::InvalidRange,
                format!("from ({}) is after to ({})", from, to),
            ));
        }
        Ok((from, to))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_millis(name: &str, value: Option<&str>) -> Result<i64, Error> {
    let value = value.map(str::trim).unwrap_or_default();
    value.parse::<i64>().map_err(|_| {
        Error::validation_code(
            ValidationErrorCode::InvalidRange,
            format!("{} must be epoch milliseconds, got {:?}", name, value),
        )
    })
}

/// `projectId` and `serviceName` query parameters.
#[derive(Debug, Clone)]
pub struct ServiceParams(pub ServiceKey);

#[async_trait]
impl<S> FromRequestParts<S> for ServiceParams
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let params = RawParams::from_parts(parts)?;
        Ok(ServiceParams(params.service()?))
    }
}

/// `projectId`, `serviceName`, `from` and `to` query parameters.
#[derive(Debug, Clone)]
pub struct SeriesParams(pub SeriesQuery);

#[async_trait]
impl<S> FromRequestParts<S> for SeriesParams
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let params = RawParams::from_parts(parts)?;
        let service = params.service()?;
        let (from, to) = params.range()?;
        Ok(SeriesParams(SeriesQuery { service, from, to }))
    }
}
