//! Workspace (tenant) context extraction.
//!
//! The authenticating gateway resolves the caller's workspace claim and
//! forwards it as the `X-Workspace-ID` header. The service treats the value
//! as an opaque identifier and scopes every job and record by it.

use crate::error::AppError;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

#[derive(Debug, Clone)]
pub struct WorkspaceContext {
    pub workspace_id: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for WorkspaceContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let workspace_id = parts
            .headers
            .get("X-Workspace-ID")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                AppError::Unauthorized(anyhow::anyhow!(
                    "Missing X-Workspace-ID header (required from gateway)"
                ))
            })?;

        tracing::Span::current().record("workspace_id", workspace_id);

        Ok(WorkspaceContext {
            workspace_id: workspace_id.to_string(),
        })
    }
}
