//! GitHub repository backend.
//!
//! Uses the repository contents API: `GET /repos/{owner}/{repo}/contents/{path}?ref={branch}`
//! to read, `PUT` on the same path to create or update. File content travels
//! base64 encoded and the blob `sha` serves as the revision.
//!
//! Status mapping:
//! - 401 / 403      -> `Auth`
//! - 404            -> `NotFound`
//! - 409 (PUT)      -> `Conflict` (stale `sha`)
//! - 422 (PUT)      -> `Conflict` when the message is about `sha`, else `Transport`
//! - anything else  -> `Transport`

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{RemoteDocument, RemoteLocation, RemoteStore, Revision};
use crate::error::StoreError;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

#[derive(Debug, Serialize)]
struct PutRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: PutContent,
}

#[derive(Debug, Deserialize)]
struct PutContent {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    message: String,
}

/// Remote store for a file in a GitHub repository.
///
/// The token is sent as a bearer credential on every request. It needs
/// contents read access for loads and contents write access for saves.
#[derive(Debug, Clone)]
pub struct GithubStore {
    client: Client,
    api: Url,
    token: String,
}

impl GithubStore {
    pub fn new(token: impl Into<String>) -> Result<Self, StoreError> {
        Self::with_api_url(token, DEFAULT_API_URL)
    }

    /// Point at another API root (GitHub Enterprise, or a mock server in tests).
    pub fn with_api_url(token: impl Into<String>, api: &str) -> Result<Self, StoreError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(StoreError::Auth("GitHub token is empty".into()));
        }
        let api = Url::parse(api)
            .map_err(|e| StoreError::Transport(format!("invalid API url '{api}': {e}")))?;
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, api, token })
    }

    fn contents_url(&self, location: &RemoteLocation) -> Result<Url, StoreError> {
        let mut url = self.api.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StoreError::Transport(format!("API url '{}' cannot be a base", self.api)))?;
            segments
                .pop_if_empty()
                .extend(["repos", location.owner.as_str(), location.repo.as_str(), "contents"])
                .extend(location.path.split('/').filter(|s| !s.is_empty()));
        }
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
    }
}

/// Turn a non-success response into the matching `StoreError`.
async fn status_error(response: Response, location: &RemoteLocation, writing: bool) -> StoreError {
    let status = response.status();
    let message = response
        .json::<ApiMessage>()
        .await
        .map(|m| m.message)
        .unwrap_or_default();
    // 422 also covers bad branches and paths; only a `sha` complaint is a stale revision.
    let stale_sha = status == StatusCode::UNPROCESSABLE_ENTITY && message.contains("sha");
    let detail = if message.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {message}")
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Auth(detail),
        StatusCode::NOT_FOUND => StoreError::NotFound(format!("{location} ({detail})")),
        StatusCode::CONFLICT if writing => StoreError::Conflict {
            location: location.to_string(),
            message: detail,
        },
        _ if writing && stale_sha => StoreError::Conflict {
            location: location.to_string(),
            message: detail,
        },
        _ => StoreError::Transport(format!("{location}: {detail}")),
    }
}

fn decode_content(body: &ContentsResponse, location: &RemoteLocation) -> Result<String, StoreError> {
    if body.encoding != "base64" {
        return Err(StoreError::Transport(format!(
            "{location}: unsupported content encoding '{}'",
            body.encoding
        )));
    }
    let packed: String = body.content.split_whitespace().collect();
    let bytes = STANDARD
        .decode(packed)
        .map_err(|e| StoreError::Transport(format!("{location}: bad base64 content: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| StoreError::Transport(format!("{location}: content is not UTF-8: {e}")))
}

#[async_trait]
impl RemoteStore for GithubStore {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn get(&self, location: &RemoteLocation) -> Result<RemoteDocument, StoreError> {
        let url = self.contents_url(location)?;
        debug!(target: "frigate_cfg::store", %url, "GET contents");

        let response = self
            .authorized(self.client.get(url))
            .query(&[("ref", location.branch.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_error(response, location, false).await);
        }

        let body: ContentsResponse = response.json().await?;
        let content = decode_content(&body, location)?;
        Ok(RemoteDocument {
            content,
            revision: Revision(body.sha),
        })
    }

    async fn put(
        &self,
        location: &RemoteLocation,
        content: &str,
        message: &str,
        expected: Option<&Revision>,
    ) -> Result<Revision, StoreError> {
        let url = self.contents_url(location)?;
        let body = PutRequest {
            message,
            content: STANDARD.encode(content),
            branch: &location.branch,
            sha: expected.map(|r| r.0.as_str()),
        };
        debug!(
            target: "frigate_cfg::store",
            %url,
            create = expected.is_none(),
            "PUT contents"
        );

        let response = self
            .authorized(self.client.put(url))
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_error(response, location, true).await);
        }

        let body: PutResponse = response.json().await?;
        info!(target: "frigate_cfg::store", %location, sha = %body.content.sha, "Committed configuration");
        Ok(Revision(body.content.sha))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CONTENTS: &str = "/repos/acme/nvr/contents/config/frigate.yml";

    fn location() -> RemoteLocation {
        RemoteLocation::new("acme", "nvr", "config/frigate.yml", "main")
    }

    async fn store(server: &MockServer) -> GithubStore {
        GithubStore::with_api_url("tok", &server.uri()).unwrap()
    }

    #[test]
    fn empty_token_is_auth_error() {
        assert_eq!(GithubStore::new("  ").unwrap_err().kind(), "auth");
    }

    #[tokio::test]
    async fn get_decodes_wrapped_base64() {
        let server = MockServer::start().await;
        let encoded = STANDARD.encode("mqtt:\n  host: test\n");
        let wrapped = format!("{}\n{}\n", &encoded[..10], &encoded[10..]);
        Mock::given(method("GET"))
            .and(path(CONTENTS))
            .and(query_param("ref", "main"))
            .and(header("authorization", "Bearer tok"))
            .and(header("accept", ACCEPT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": "abc123",
                "content": wrapped,
                "encoding": "base64"
            })))
            .mount(&server)
            .await;

        let doc = store(&server).await.get(&location()).await.unwrap();
        assert_eq!(doc.content, "mqtt:\n  host: test\n");
        assert_eq!(doc.revision, Revision("abc123".into()));
    }

    #[tokio::test]
    async fn status_codes_map_to_error_kinds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/nvr/contents/missing.yml"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/nvr/contents/secret.yml"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/nvr/contents/broken.yml"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let gh = store(&server).await;
        let at = |p: &str| RemoteLocation::new("acme", "nvr", p, "main");

        assert_eq!(gh.get(&at("missing.yml")).await.unwrap_err().kind(), "not_found");
        assert_eq!(gh.revision(&at("missing.yml")).await.unwrap(), None);
        let auth = gh.get(&at("secret.yml")).await.unwrap_err();
        assert_eq!(auth.kind(), "auth");
        assert!(auth.to_string().contains("Bad credentials"));
        assert_eq!(gh.get(&at("broken.yml")).await.unwrap_err().kind(), "transport");
    }

    #[tokio::test]
    async fn put_sends_sha_and_returns_new_revision() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(CONTENTS))
            .and(body_partial_json(json!({
                "message": "tune motion",
                "branch": "main",
                "sha": "old",
                "content": STANDARD.encode("a: 1\n")
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": {"sha": "new"},
                "commit": {"sha": "c0ffee"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let rev = store(&server)
            .await
            .put(&location(), "a: 1\n", "tune motion", Some(&Revision("old".into())))
            .await
            .unwrap();
        assert_eq!(rev, Revision("new".into()));
    }

    #[tokio::test]
    async fn stale_sha_is_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(CONTENTS))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "message": "config/frigate.yml does not match old"
            })))
            .mount(&server)
            .await;

        let err = store(&server)
            .await
            .put(&location(), "a: 1\n", "m", Some(&Revision("old".into())))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "conflict");
    }

    #[tokio::test]
    async fn create_over_existing_is_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(CONTENTS))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "message": "Invalid request.\n\n\"sha\" wasn't supplied."
            })))
            .mount(&server)
            .await;

        let err = store(&server)
            .await
            .put(&location(), "a: 1\n", "m", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "conflict");
    }

    #[tokio::test]
    async fn unprocessable_without_sha_is_transport() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(CONTENTS))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "message": "Branch nope not found"
            })))
            .mount(&server)
            .await;

        let err = store(&server)
            .await
            .put(&location(), "a: 1\n", "m", Some(&Revision("old".into())))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "transport");
        assert!(err.to_string().contains("Branch nope not found"));
    }
}
