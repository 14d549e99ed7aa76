//! Actor context extractor.
//!
//! Every mutating operation requires an authenticated actor identity, set
//! by the gateway in the `X-Actor-Id` header after authentication. The id
//! is passed through to the audit trail untouched; authorization itself is
//! out of scope here.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;
use uuid::Uuid;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";

/// Acting identity extracted from request headers.
#[derive(Debug, Clone, Copy)]
pub struct ActorContext {
    pub actor_id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for ActorContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACTOR_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::AuthError(anyhow::anyhow!(
                    "Missing {} header (required from gateway)",
                    ACTOR_ID_HEADER
                ))
            })?;

        let actor_id = Uuid::parse_str(raw).map_err(|_| {
            AppError::AuthError(anyhow::anyhow!("{} header is not a valid UUID", ACTOR_ID_HEADER))
        })?;

        tracing::Span::current().record("actor_id", raw);

        Ok(ActorContext { actor_id })
    }
}
