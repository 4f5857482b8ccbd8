use anyhow::{Context, Result};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::debug;

use super::{ReleaseAsset, ReleaseSource};
use crate::constants::{DEFAULT_API_BASE_URL, RELEASES_PER_PAGE};
use crate::core::SelfupError;

/// [`ReleaseSource`] backed by the GitHub REST API.
///
/// Requests are unauthenticated unless a token is supplied, in which case it
/// is sent as a bearer token (raising the API rate limit from 60 to 5000
/// requests per hour).
///
/// # Examples
///
/// ```rust,no_run
/// use selfup_cli::github::{GitHubReleaseClient, ReleaseSource};
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = GitHubReleaseClient::new(reqwest::Client::new())
///     .with_token(std::env::var("GITHUB_TOKEN").ok());
/// let latest = client.latest_release("jenkins-zh", "jenkins-cli").await?;
/// println!("latest: {}", latest.tag_name);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GitHubReleaseClient {
    client: reqwest::Client,
    api_base_url: String,
    token: Option<String>,
}

impl GitHubReleaseClient {
    /// Create a client against `https://api.github.com`.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token: None,
        }
    }

    /// Use a different API endpoint (GitHub Enterprise, or a test server).
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Authenticate requests with a token; empty tokens are ignored.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .context("GitHub token contains invalid header characters")?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .headers(self.headers()?)
            .send()
            .await
            .with_context(|| format!("Failed to query {url}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SelfupError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        response.json::<T>().await.with_context(|| format!("Failed to parse response from {url}"))
    }
}

impl ReleaseSource for GitHubReleaseClient {
    async fn latest_release(&self, org: &str, repo: &str) -> Result<ReleaseAsset> {
        let url = format!("{}/repos/{org}/{repo}/releases/latest", self.api_base_url);
        let release: ReleaseAsset = self.get_json(&url).await?;
        debug!("Latest release of {}/{}: {}", org, repo, release.tag_name);
        Ok(release)
    }

    async fn release_by_tag(
        &self,
        org: &str,
        repo: &str,
        tag: &str,
    ) -> Result<Option<ReleaseAsset>> {
        let url = format!(
            "{}/repos/{org}/{repo}/releases?per_page={RELEASES_PER_PAGE}",
            self.api_base_url
        );
        let releases: Vec<ReleaseAsset> = self.get_json(&url).await?;
        Ok(releases.into_iter().find(|release| release.tag_name == tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::HttpFixture;

    fn client_for(server: &HttpFixture) -> GitHubReleaseClient {
        GitHubReleaseClient::new(reqwest::Client::new()).with_api_base_url(server.base_url())
    }

    #[tokio::test]
    async fn test_latest_release() {
        let server = HttpFixture::start().await;
        server.serve_json(
            "/repos/jenkins-zh/jenkins-cli/releases/latest",
            r#"{"tag_name":"v0.0.30","body":"- fix upgrade","id":1}"#,
        );

        let release = client_for(&server).latest_release("jenkins-zh", "jenkins-cli").await.unwrap();
        assert_eq!(release, ReleaseAsset::new("v0.0.30", "- fix upgrade"));
    }

    #[tokio::test]
    async fn test_latest_release_with_null_body() {
        let server = HttpFixture::start().await;
        server.serve_json("/repos/o/r/releases/latest", r#"{"tag_name":"v1.0.0","body":null}"#);

        let release = client_for(&server).latest_release("o", "r").await.unwrap();
        assert_eq!(release.body, "");
    }

    #[tokio::test]
    async fn test_latest_release_http_error() {
        let server = HttpFixture::start().await;

        let err = client_for(&server).latest_release("o", "missing").await.unwrap_err();
        let selfup = err.downcast_ref::<SelfupError>().unwrap();
        assert!(matches!(selfup, SelfupError::HttpStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_release_by_tag() {
        let server = HttpFixture::start().await;
        server.serve_json(
            "/repos/o/r/releases",
            r#"[{"tag_name":"v2.0.0","body":"two"},{"tag_name":"v1.0.0","body":"one"}]"#,
        );
        let client = client_for(&server);

        let found = client.release_by_tag("o", "r", "v1.0.0").await.unwrap();
        assert_eq!(found, Some(ReleaseAsset::new("v1.0.0", "one")));

        let missing = client.release_by_tag("o", "r", "v3.0.0").await.unwrap();
        assert_eq!(missing, None);

        let requests = server.requests();
        assert!(requests.iter().all(|r| r.path.ends_with("per_page=100")));
    }

    #[tokio::test]
    async fn test_token_is_sent_as_bearer() {
        let server = HttpFixture::start().await;
        server.serve_json("/repos/o/r/releases/latest", r#"{"tag_name":"v1.0.0","body":""}"#);

        client_for(&server)
            .with_token(Some("secret".to_string()))
            .latest_release("o", "r")
            .await
            .unwrap();

        let requests = server.requests();
        assert_eq!(requests[0].authorization.as_deref(), Some("Bearer secret"));
    }

    #[test]
    fn test_blank_token_is_ignored() {
        let client = GitHubReleaseClient::new(reqwest::Client::new()).with_token(Some("  ".into()));
        assert!(client.headers().unwrap().get(AUTHORIZATION).is_none());
    }
}
