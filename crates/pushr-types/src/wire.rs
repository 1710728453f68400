//! HTTP contract shared by the server and the client.

/// Header carrying the access token.
pub const TOKEN_HEADER: &str = "X-PUSHR-TOKEN";

/// Query parameter accepted as a token for browser-friendly links.
pub const TOKEN_QUERY_PARAM: &str = "token";

/// Body of a successful ping.
pub const PING_RESPONSE: &str = "OK";

/// Route patterns in axum path syntax.
pub mod endpoints {
    pub const PING: &str = "/ping";
    pub const RELEASE: &str = "/releases/:name";
    pub const VERSION: &str = "/releases/:name/:version";
    pub const UPLOAD: &str = "/releases/:name/:version/:filename";
    pub const REPO_LATEST: &str = "/repos/:ns/:repo/releases/:channel/latest";
    pub const REPO_UPLOAD: &str = "/repos/:ns/:repo/versions/:version/:filename";
    pub const REPO_ASSET: &str = "/repos/:ns/:repo/assets/:id";
}

/// Concrete request paths, built by the client.
pub mod paths {
    pub fn release(name: &str) -> String {
        format!("/releases/{name}")
    }

    pub fn version(name: &str, version: &str) -> String {
        format!("/releases/{name}/{version}")
    }

    pub fn upload(name: &str, version: &str, filename: &str) -> String {
        format!("/releases/{name}/{version}/{filename}")
    }

    pub fn repo_latest(ns: &str, repo: &str, channel: &str) -> String {
        format!("/repos/{ns}/{repo}/releases/{channel}/latest")
    }

    pub fn repo_upload(ns: &str, repo: &str, version: &str, filename: &str) -> String {
        format!("/repos/{ns}/{repo}/versions/{version}/{filename}")
    }

    pub fn repo_asset(ns: &str, repo: &str, id: &str) -> String {
        format!("/repos/{ns}/{repo}/assets/{id}")
    }
}
