//! Request extractors that reject with [`ServiceError`] so every failure
//! reaches the client as the standard JSON error body.

use crate::errors::ServiceError;
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Query, Request},
    http::{request::Parts, HeaderMap},
    Json,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;
use validator::Validate;

pub const LOCATION_ID_HEADER: &str = "x-location-id";
pub const LOCATION_IDS_HEADER: &str = "x-location-ids";

/// JSON body that has been deserialised and passed `validator` rules.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| match rejection {
                // Well-formed JSON with missing or mistyped fields
                JsonRejection::JsonDataError(err) => ServiceError::ValidationError(err.body_text()),
                other => ServiceError::InvalidInput(other.body_text()),
            })?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Query string that has been deserialised and passed `validator` rules.
#[derive(Debug, Clone)]
pub struct ValidatedQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ServiceError::InvalidInput(rejection.body_text()))?;
        value.validate()?;
        Ok(ValidatedQuery(value))
    }
}

/// The location a request acts on, taken from the mandatory `X-Location-Id` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationHeader(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for LocationHeader
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        optional_location(&parts.headers)?
            .map(LocationHeader)
            .ok_or_else(|| {
                ServiceError::InvalidInput("X-Location-Id header is required".to_string())
            })
    }
}

/// Optional `X-Location-Id`, for endpoints where the body may carry the location instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptionalLocationHeader(pub Option<Uuid>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalLocationHeader
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalLocationHeader(optional_location(&parts.headers)?))
    }
}

/// Location scope from the comma-separated `x-location-ids` header. An absent
/// header means unscoped; a present header must name at least one location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationIdsHeader(pub Vec<Uuid>);

#[async_trait]
impl<S> FromRequestParts<S> for LocationIdsHeader
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(LOCATION_IDS_HEADER) else {
            return Ok(LocationIdsHeader::default());
        };
        let raw = raw.to_str().map_err(|_| {
            ServiceError::InvalidInput("x-location-ids header is not valid ASCII".to_string())
        })?;
        parse_location_ids(raw).map(LocationIdsHeader)
    }
}

fn optional_location(headers: &HeaderMap) -> Result<Option<Uuid>, ServiceError> {
    let Some(value) = headers.get(LOCATION_ID_HEADER) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| ServiceError::InvalidInput("X-Location-Id header is not valid ASCII".into()))?
        .trim();
    if value.is_empty() {
        return Ok(None);
    }
    Uuid::parse_str(value)
        .map(Some)
        .map_err(|_| ServiceError::InvalidInput(format!("X-Location-Id is not a UUID: {value}")))
}

pub(crate) fn parse_location_ids(raw: &str) -> Result<Vec<Uuid>, ServiceError> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Uuid::parse_str(s).map_err(|_| {
                ServiceError::InvalidInput(format!("x-location-ids contains a non-UUID value: {s}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if ids.is_empty() {
        return Err(ServiceError::InvalidInput(
            "x-location-ids must list at least one location".to_string(),
        ));
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn location_ids_header_accepts_spaces_and_trailing_commas() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let parsed = parse_location_ids(&format!(" {a}, {b},")).unwrap();
        assert_eq!(parsed, vec![a, b]);
    }

    #[test]
    fn location_ids_header_without_ids_is_rejected() {
        for raw in [",", " , ", ""] {
            assert_matches!(parse_location_ids(raw), Err(ServiceError::InvalidInput(_)));
        }
    }

    #[test]
    fn location_ids_header_rejects_garbage() {
        assert_matches!(
            parse_location_ids("not-a-uuid"),
            Err(ServiceError::InvalidInput(_))
        );
    }

    #[test]
    fn blank_location_header_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION_ID_HEADER, " ".parse().unwrap());
        assert_eq!(optional_location(&headers).unwrap(), None);
    }
}
