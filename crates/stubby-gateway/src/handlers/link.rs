use crate::error::{AppError, Result};
use crate::model::{LinkInfoResponse, SaveLinkRequest, SaveLinkResponse};
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use jiff::Timestamp;
use tracing::debug;

/// `POST /`: stores `url` and answers with its absolute short URL.
///
/// The body is only accepted as `application/json`; anything else, a body
/// that does not decode, or a url that is not a valid `Location` value is a
/// 400 before the store is touched.
pub async fn save_link_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SaveLinkResponse>> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"));
    if !is_json {
        return Err(AppError::bad_request("expected application/json"));
    }

    let request: SaveLinkRequest =
        serde_json::from_slice(&body).map_err(|err| AppError::bad_request(err.to_string()))?;
    if HeaderValue::from_str(&request.url).is_err() {
        return Err(AppError::bad_request("url cannot be used as a redirect target"));
    }
    let ttl = request.ttl_at(Timestamp::now());

    let key = state.links().save(&request.url, ttl).await?;
    debug!(key = %key, ttl_secs = ttl.as_secs(), "link saved");

    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    Ok(Json(SaveLinkResponse {
        url: state.short_url(&key, host),
    }))
}

/// `GET /{key}`: permanent redirect to the stored URL.
pub async fn redirect_handler(
    Path(key): Path<String>,
    State(state): State<AppState>,
) -> Result<Response> {
    let url = state.links().lookup(&key).await?;
    let location = HeaderValue::from_str(&url)
        .map_err(|_| AppError::bad_request("stored url is not a valid header value"))?;

    Ok((StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response())
}

/// `GET /info/{key}`: metadata without counting a click.
pub async fn info_handler(
    Path(key): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<LinkInfoResponse>> {
    let info = state.links().info(&key).await?;
    Ok(Json(info.into()))
}
