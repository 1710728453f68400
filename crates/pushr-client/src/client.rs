use std::path::Path;
use std::time::Duration;

use futures::TryStreamExt;
use pushr_store::{receive_to_file, TransferLimits, DEFAULT_CHUNK_SIZE};
use pushr_types::wire::{endpoints, paths, PING_RESPONSE, TOKEN_HEADER};
use pushr_types::{Channel, RegistryRelease, Release, Version};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Body, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::{debug, info};

use crate::error::{ClientError, ClientResult};

const JSON: &str = "application/json";
const OCTET_STREAM: &str = "application/octet-stream";

/// Connection settings for a [`PushrClient`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Server root, e.g. `http://127.0.0.1:7000`.
    pub base_url: String,
    /// Sent on reads when non-empty.
    pub read_token: String,
    /// Sent on uploads when non-empty.
    pub write_token: String,
    pub connect_timeout: Duration,
    /// Buffer size for streaming payloads in both directions.
    pub chunk_size: usize,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:7000".into(),
            read_token: String::new(),
            write_token: String::new(),
            connect_timeout: Duration::from_secs(30),
            chunk_size: DEFAULT_CHUNK_SIZE,
            user_agent: format!("pushr/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_tokens(mut self, read: impl Into<String>, write: impl Into<String>) -> Self {
        self.read_token = read.into();
        self.write_token = write.into();
        self
    }
}

/// Client for one pushr server. Requests are issued once; nothing is retried.
#[derive(Clone)]
pub struct PushrClient {
    http: Client,
    config: ClientConfig,
}

impl PushrClient {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn with_token(request: RequestBuilder, token: &str) -> RequestBuilder {
        if token.is_empty() {
            request
        } else {
            request.header(TOKEN_HEADER, token)
        }
    }

    async fn get(&self, path: &str, accept: &str) -> ClientResult<Response> {
        debug!(path, "GET");
        let request = self.http.get(self.url(path)).header(ACCEPT, accept);
        let response = Self::with_token(request, &self.config.read_token).send().await?;
        check(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        Ok(self.get(path, JSON).await?.json().await?)
    }

    /// Liveness check. Fails unless the server answers `OK`.
    pub async fn ping(&self) -> ClientResult<()> {
        let body = self.get(endpoints::PING, "*/*").await?.text().await?;
        if body.trim() != PING_RESPONSE {
            return Err(ClientError::Server {
                status: 200,
                message: format!("unexpected ping response {body:?}"),
            });
        }
        Ok(())
    }

    pub async fn release(&self, name: &str) -> ClientResult<Release> {
        self.get_json(&paths::release(name)).await
    }

    pub async fn version(&self, name: &str, version: &str) -> ClientResult<Version> {
        self.get_json(&paths::version(name, version)).await
    }

    /// Newest version of `name` admitted by `channel`, resolved locally.
    pub async fn latest_version(
        &self,
        name: &str,
        channel: &Channel,
    ) -> ClientResult<(String, Version)> {
        let release = self.release(name).await?;
        let (version, meta) = release.latest(channel)?;
        Ok((version.to_string(), meta.clone()))
    }

    /// Newest registry release in `channel`, resolved by the server.
    pub async fn latest_release(
        &self,
        ns: &str,
        repo: &str,
        channel: &Channel,
    ) -> ClientResult<RegistryRelease> {
        self.get_json(&paths::repo_latest(ns, repo, channel.as_str())).await
    }

    /// Download a version's payload to `dest`, returning the bytes written.
    ///
    /// `dest` is only created once the whole payload has arrived.
    pub async fn download(&self, name: &str, version: &str, dest: &Path) -> ClientResult<u64> {
        let response = self.get(&paths::version(name, version), OCTET_STREAM).await?;
        self.save_body(response, dest).await
    }

    pub async fn download_asset(
        &self,
        ns: &str,
        repo: &str,
        id: &str,
        dest: &Path,
    ) -> ClientResult<u64> {
        let response = self.get(&paths::repo_asset(ns, repo, id), OCTET_STREAM).await?;
        self.save_body(response, dest).await
    }

    async fn save_body(&self, response: Response, dest: &Path) -> ClientResult<u64> {
        let stream = response.bytes_stream().map_err(std::io::Error::other);
        let mut reader = StreamReader::new(Box::pin(stream));
        let written = receive_to_file(&mut reader, dest, self.limits()).await?;
        info!(path = %dest.display(), bytes = written, "download complete");
        Ok(written)
    }

    /// Upload `file` as `version` of `name`, named after its basename.
    pub async fn upload(&self, name: &str, version: &str, file: &Path) -> ClientResult<()> {
        let filename = basename(file)?;
        self.post_file(&paths::upload(name, version, filename), file).await
    }

    /// Upload `file` as `version` of the registry repository `ns/repo`.
    pub async fn upload_to_repo(
        &self,
        ns: &str,
        repo: &str,
        version: &str,
        file: &Path,
    ) -> ClientResult<()> {
        let filename = basename(file)?;
        self.post_file(&paths::repo_upload(ns, repo, version, filename), file).await
    }

    async fn post_file(&self, path: &str, file: &Path) -> ClientResult<()> {
        let source = tokio::fs::File::open(file).await?;
        let size = source.metadata().await?.len();
        let body = Body::wrap_stream(ReaderStream::with_capacity(source, self.limits().chunk_size));
        debug!(path, bytes = size, "POST");

        let request = self
            .http
            .post(self.url(path))
            .header(CONTENT_TYPE, OCTET_STREAM)
            .body(body);
        let response = Self::with_token(request, &self.config.write_token).send().await?;
        check(response).await?;
        info!(path, bytes = size, "upload accepted");
        Ok(())
    }

    fn limits(&self) -> TransferLimits {
        TransferLimits {
            chunk_size: self.config.chunk_size.max(1),
            max_bytes: None,
        }
    }
}

impl std::fmt::Debug for PushrClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushrClient")
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

fn basename(file: &Path) -> ClientResult<&str> {
    file.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ClientError::Invalid(format!("no usable file name in {}", file.display())))
}

async fn check(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::from_status(status, &body))
}
