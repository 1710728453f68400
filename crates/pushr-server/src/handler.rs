use std::io;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{ACCEPT, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use futures::TryStreamExt;
use pushr_store::{open_payload, receive_to_file};
use pushr_types::wire::PING_RESPONSE;
use pushr_types::{
    file_extension, validate_release_name, Channel, RegistryRelease, Release, Version,
};
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::info;

use crate::error::ServerResult;
use crate::state::AppState;

fn repo_key(ns: &str, repo: &str) -> String {
    format!("{ns}/{repo}")
}

fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"))
}

/// Liveness probe.
pub async fn ping() -> &'static str {
    PING_RESPONSE
}

/// `GET /releases/:name`
pub async fn get_release(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ServerResult<Json<Release>> {
    validate_release_name(&name)?;
    Ok(Json(state.store.get(&name)?))
}

/// `GET /releases/:name/:version`, metadata or payload depending on `Accept`.
pub async fn get_version(
    State(state): State<AppState>,
    Path((name, version)): Path<(String, String)>,
    headers: HeaderMap,
) -> ServerResult<Response> {
    validate_release_name(&name)?;
    let meta = state.store.version(&name, &version)?;
    if wants_json(&headers) {
        return Ok(Json(meta).into_response());
    }
    stream_payload(&state, &meta).await
}

/// `POST /releases/:name/:version/:filename`
pub async fn upload(
    State(state): State<AppState>,
    Path((name, version, filename)): Path<(String, String, String)>,
    body: Body,
) -> ServerResult<StatusCode> {
    // `%2F` decodes inside a segment; registry keys are only reachable under /repos
    validate_release_name(&name)?;
    store_upload(&state, &name, &version, &filename, body).await
}

/// `GET /repos/:ns/:repo/releases/:channel/latest`
///
/// The channel filters which version is picked, with the same resolver the
/// client uses over a full listing.
pub async fn repo_latest(
    State(state): State<AppState>,
    Path((ns, repo, channel)): Path<(String, String, String)>,
) -> ServerResult<Json<RegistryRelease>> {
    let key = repo_key(&ns, &repo);
    let (version, meta) = state.store.latest(&key, &Channel::new(channel))?;
    Ok(Json(RegistryRelease::from_version(&key, &version, &meta)))
}

/// `POST /repos/:ns/:repo/versions/:version/:filename`
pub async fn repo_upload(
    State(state): State<AppState>,
    Path((ns, repo, version, filename)): Path<(String, String, String, String)>,
    body: Body,
) -> ServerResult<StatusCode> {
    store_upload(&state, &repo_key(&ns, &repo), &version, &filename, body).await
}

/// `GET /repos/:ns/:repo/assets/:id`
pub async fn repo_asset(
    State(state): State<AppState>,
    Path((ns, repo, id)): Path<(String, String, String)>,
) -> ServerResult<Response> {
    let meta = state.store.version(&repo_key(&ns, &repo), &id)?;
    stream_payload(&state, &meta).await
}

/// Validate, claim the slot, write the file, then index it.
async fn store_upload(
    state: &AppState,
    key: &str,
    version: &str,
    filename: &str,
    body: Body,
) -> ServerResult<StatusCode> {
    let ext = file_extension(filename)?;
    let reservation = state
        .store
        .reserve(key, version, ext, state.content_types.lookup(ext))?;
    let dest = state.data_dir().join(reservation.filename());

    let stream = body.into_data_stream().map_err(io::Error::other);
    let mut reader = StreamReader::new(stream);
    // On error the reservation drops here, freeing the slot; the partial file
    // is already gone.
    let size = receive_to_file(&mut reader, &dest, state.limits).await?;

    let stored = reservation.commit(size);
    info!(
        release = %key,
        %version,
        filename = %stored.filename,
        content_type = %stored.content_type,
        size,
        "upload stored"
    );
    Ok(StatusCode::CREATED)
}

/// Stream a stored payload in `chunk_size` pieces.
async fn stream_payload(state: &AppState, meta: &Version) -> ServerResult<Response> {
    let (file, len) = open_payload(&state.payload_path(meta)).await?;
    let attachment = meta.filename.rsplit('/').next().unwrap_or(&meta.filename);
    let headers = [
        (CONTENT_TYPE, meta.content_type.clone()),
        (CONTENT_LENGTH, len.to_string()),
        (CONTENT_DISPOSITION, format!("attachment; filename=\"{attachment}\"")),
    ];
    let body = Body::from_stream(ReaderStream::with_capacity(file, state.limits.chunk_size));
    Ok((headers, body).into_response())
}
