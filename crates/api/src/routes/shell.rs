//! Cache-first app shell assets.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::shell::{AssetSource, ShellCache, ShellError};
use crate::state::AppState;

/// Serve the shell entry point.
///
/// GET /app/
pub async fn index(State(state): State<AppState>) -> Result<Response, AppError> {
    let (cache, source) = state.shell()?;
    serve(cache, source, "").await
}

/// Serve a shell asset.
///
/// GET /app/{*path}
pub async fn asset(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, AppError> {
    let (cache, source) = state.shell()?;
    serve(cache, source, &path).await
}

/// Serve `path` through `cache`, with an `x-cache` header saying whether the
/// origin was contacted.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the origin has no such asset.
pub async fn serve<S: AssetSource>(
    cache: &ShellCache,
    source: &S,
    path: &str,
) -> Result<Response, AppError> {
    let (asset, status) = cache
        .fetch(path, source)
        .await
        .map_err(|e| match e {
            ShellError::InvalidPath(p) => AppError::BadRequest(format!("invalid path: {p}")),
            other => AppError::Shell(other),
        })?
        .ok_or_else(|| AppError::NotFound(path.to_string()))?;

    let mut response = Body::from(asset.body).into_response();
    let headers = response.headers_mut();
    if let Some(content_type) = asset
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
    {
        headers.insert(header::CONTENT_TYPE, content_type);
    }
    headers.insert("x-cache", HeaderValue::from_static(status.as_header()));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=300"),
    );
    Ok(response)
}
