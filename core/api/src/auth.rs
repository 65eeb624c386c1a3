//! Caller identity extraction.
//!
//! Authentication happens upstream; the resolved user id arrives in the
//! `x-resolved-user` header. This extractor only checks that the header
//! is present and well-formed — a missing or empty value is a 401.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use credvault_common::{Error, OwnerId, Result};

use crate::error::ApiError;

/// Header carrying the upstream-resolved user id.
pub const RESOLVED_USER_HEADER: &str = "x-resolved-user";

/// The authenticated owner on whose behalf the request runs.
#[derive(Debug, Clone)]
pub struct OwnerIdentity(pub OwnerId);

/// Parse the owner id out of the header value, if any.
pub fn owner_from_header(value: Option<&str>) -> Result<OwnerId> {
    let value = value
        .ok_or_else(|| Error::Auth("caller identity not resolved".to_string()))?
        .trim();
    if value.is_empty() {
        return Err(Error::Auth("caller identity not resolved".to_string()));
    }
    OwnerId::new(value)
}

impl<S> FromRequestParts<S> for OwnerIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(RESOLVED_USER_HEADER)
            .and_then(|v| v.to_str().ok());
        owner_from_header(header).map(OwnerIdentity).map_err(ApiError)
    }
}
