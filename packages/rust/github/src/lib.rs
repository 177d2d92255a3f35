//! GitHub repository search and README retrieval.
//!
//! [`GithubClient`] is built once from a [`GithubConfig`] and shared by every
//! call. Search aggregates hits across all terms; README fetching runs on a
//! bounded pool and keeps input order. Per-term and per-repository failures are
//! returned as [`FetchFailure`] values next to the successful results so one
//! bad term or repository never aborts the batch.

mod decode;

use std::sync::Arc;
use std::time::Duration;

use athenai_shared::{AthenaiError, GithubConfig, ReadmeRecord, RepoRef, Result, SearchMode};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

pub use decode::{decode_readme_content, utf8_dropping_invalid};

/// User-Agent string for API requests (GitHub rejects requests without one).
const USER_AGENT: &str = concat!("athenai/", env!("CARGO_PKG_VERSION"));

/// Media type for the REST API.
const GITHUB_JSON: &str = "application/vnd.github+json";

/// REST API version pinned in every request.
const API_VERSION: &str = "2022-11-28";

// ---------------------------------------------------------------------------
// Failures and outcomes
// ---------------------------------------------------------------------------

/// A single term or repository that produced no result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchFailure {
    /// The search request for `term` did not yield a usable 200 response.
    #[error("search for '{term}' failed: {message}")]
    SearchFailed {
        term: String,
        /// HTTP status, absent for transport errors.
        status: Option<u16>,
        message: String,
    },

    /// The README request for `repo` did not yield a usable 200 response.
    #[error("README fetch for {repo} failed: {message}")]
    ReadmeFetchFailed {
        repo: RepoRef,
        status: Option<u16>,
        message: String,
    },
}

impl FetchFailure {
    /// HTTP status of the failed response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::SearchFailed { status, .. } | Self::ReadmeFetchFailed { status, .. } => *status,
        }
    }
}

/// Repositories found across all terms, plus the terms that failed.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    /// Hits in term order, then result order within a term.
    pub repos: Vec<RepoRef>,
    pub failures: Vec<FetchFailure>,
}

/// Decoded READMEs in input order, plus the repositories that failed.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub records: Vec<ReadmeRecord>,
    pub failures: Vec<FetchFailure>,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    name: String,
    owner: SearchOwner,
}

#[derive(Debug, Deserialize)]
struct SearchOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct ReadmeResponse {
    content: String,
}

// ---------------------------------------------------------------------------
// GithubClient
// ---------------------------------------------------------------------------

/// Authenticated client for the search and contents endpoints.
#[derive(Clone)]
pub struct GithubClient {
    config: Arc<GithubConfig>,
    client: Client,
}

impl GithubClient {
    /// Build a client. The token is attached to every request as a bearer credential.
    pub fn new(config: GithubConfig) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| AthenaiError::config("GitHub token contains invalid header characters"))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_JSON));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AthenaiError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    pub fn config(&self) -> &GithubConfig {
        &self.config
    }

    /// API URL identifying a repository, as stored in [`ReadmeRecord::repo_url`].
    pub fn repo_url(&self, repo: &RepoRef) -> String {
        format!("{}/repos/{}/{}", self.config.api_base, repo.owner, repo.name)
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    /// Search once per term and collect every hit.
    #[instrument(skip_all, fields(mode = %mode, terms = terms.len()))]
    pub async fn search(&self, terms: &[String], mode: SearchMode) -> SearchOutcome {
        let mut outcome = SearchOutcome::default();

        for term in terms {
            match self.search_term(term, mode).await {
                Ok(repos) => {
                    debug!(%term, hits = repos.len(), "search term complete");
                    outcome.repos.extend(repos);
                }
                Err(failure) => {
                    warn!(%term, status = ?failure.status(), error = %failure, "search term failed");
                    outcome.failures.push(failure);
                }
            }
        }

        info!(
            repos = outcome.repos.len(),
            failures = outcome.failures.len(),
            "search complete"
        );
        outcome
    }

    /// Search a single term.
    pub async fn search_term(
        &self,
        term: &str,
        mode: SearchMode,
    ) -> std::result::Result<Vec<RepoRef>, FetchFailure> {
        let url = format!("{}/search/repositories", self.config.api_base);
        let query = mode.query_for(term);
        let per_page = self.config.per_page.to_string();

        let failed = |status: Option<u16>, message: String| FetchFailure::SearchFailed {
            term: term.to_string(),
            status,
            message,
        };

        let response = self
            .client
            .get(&url)
            .query(&[("q", query.as_str()), ("per_page", per_page.as_str())])
            .send()
            .await
            .map_err(|e| failed(None, e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(failed(Some(status.as_u16()), format!("HTTP {status}")));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| failed(Some(status.as_u16()), format!("invalid search response: {e}")))?;

        Ok(body
            .items
            .into_iter()
            .map(|item| RepoRef::new(item.owner.login, item.name))
            .collect())
    }

    // -----------------------------------------------------------------------
    // READMEs
    // -----------------------------------------------------------------------

    /// Fetch and decode the README of every repository.
    ///
    /// At most `concurrency` requests are in flight. Records come back in the
    /// order of `repos`; a failed repository contributes a failure and no record.
    #[instrument(skip_all, fields(repos = repos.len(), concurrency = self.config.concurrency))]
    pub async fn fetch_readmes(&self, repos: &[RepoRef]) -> FetchOutcome {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1) as usize));
        let mut handles = Vec::with_capacity(repos.len());

        for repo in repos {
            let this = self.clone();
            let sem = semaphore.clone();
            let repo = repo.clone();

            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire().await.map_err(|e| FetchFailure::ReadmeFetchFailed {
                    repo: repo.clone(),
                    status: None,
                    message: e.to_string(),
                })?;
                this.fetch_readme(&repo).await
            }));
        }

        let mut outcome = FetchOutcome::default();
        for (repo, handle) in repos.iter().zip(handles) {
            let failure = match handle.await {
                Ok(Ok(record)) => {
                    outcome.records.push(record);
                    continue;
                }
                Ok(Err(failure)) => failure,
                Err(e) => FetchFailure::ReadmeFetchFailed {
                    repo: repo.clone(),
                    status: None,
                    message: format!("task failed: {e}"),
                },
            };
            warn!(%repo, status = ?failure.status(), error = %failure, "README fetch failed");
            outcome.failures.push(failure);
        }

        info!(
            records = outcome.records.len(),
            failures = outcome.failures.len(),
            "README fetch complete"
        );
        outcome
    }

    /// Fetch and decode one README.
    pub async fn fetch_readme(
        &self,
        repo: &RepoRef,
    ) -> std::result::Result<ReadmeRecord, FetchFailure> {
        let repo_url = self.repo_url(repo);
        let readme_url = format!("{repo_url}/readme");

        let failed = |status: Option<u16>, message: String| FetchFailure::ReadmeFetchFailed {
            repo: repo.clone(),
            status,
            message,
        };

        debug!(%repo, "fetching README");

        let response = self
            .client
            .get(&readme_url)
            .send()
            .await
            .map_err(|e| failed(None, e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(failed(Some(status.as_u16()), format!("HTTP {status}")));
        }

        let body: ReadmeResponse = response
            .json()
            .await
            .map_err(|e| failed(Some(status.as_u16()), format!("invalid README response: {e}")))?;

        Ok(ReadmeRecord {
            repo_url,
            readme: decode_readme_content(&body.content),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GithubClient {
        GithubClient::new(GithubConfig {
            api_base: server.uri(),
            token: "test-token".into(),
            timeout_secs: 5,
            per_page: 30,
            concurrency: 4,
        })
        .expect("build client")
    }

    fn fixture(name: &str) -> String {
        let path = format!("../../../fixtures/github/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    fn readme_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "type": "file",
            "encoding": "base64",
            "content": STANDARD.encode(text),
        })
    }

    async fn mount_readme(server: &MockServer, owner: &str, name: &str, text: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/repos/{owner}/{name}/readme")))
            .respond_with(ResponseTemplate::new(200).set_body_json(readme_body(text)))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn search_aggregates_across_terms() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/repositories"))
            .and(query_param("q", "topic:space"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(fixture("search_space.json")),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/search/repositories"))
            .and(query_param("q", "topic:astronomy"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(fixture("search_astronomy.json")),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let terms = vec!["space".to_string(), "astronomy".to_string()];
        let outcome = client.search(&terms, SearchMode::Topic).await;

        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.repos.len(), 5);
        assert_eq!(outcome.repos[0], RepoRef::new("nasa", "fprime"));
        assert_eq!(outcome.repos[4], RepoRef::new("astropy", "astropy"));
    }

    #[tokio::test]
    async fn description_search_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/repositories"))
            .and(query_param("q", "rockets in:description"))
            .and(query_param("per_page", "30"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(fixture("search_rockets.json")),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let repos = client
            .search_term("rockets", SearchMode::Description)
            .await
            .expect("search");
        assert_eq!(repos, vec![RepoRef::new("openrocket", "openrocket")]);
    }

    #[tokio::test]
    async fn failed_term_is_recorded_and_batch_continues() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("q", "topic:space"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(query_param("q", "topic:astronomy"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(fixture("search_astronomy.json")),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let terms = vec!["space".to_string(), "astronomy".to_string()];
        let outcome = client.search(&terms, SearchMode::Topic).await;

        assert_eq!(outcome.repos.len(), 3);
        assert_eq!(outcome.failures.len(), 1);
        match &outcome.failures[0] {
            FetchFailure::SearchFailed { term, status, .. } => {
                assert_eq!(term, "space");
                assert_eq!(*status, Some(403));
            }
            other => panic!("expected SearchFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_search_body_is_a_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/repositories"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"message":"odd"}"#))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .search_term("space", SearchMode::Topic)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(200));
        assert!(err.to_string().contains("invalid search response"));
    }

    #[tokio::test]
    async fn readme_is_decoded() {
        let server = MockServer::start().await;
        mount_readme(&server, "openrocket", "openrocket", "# OpenRocket\n").await;

        let client = client_for(&server);
        let record = client
            .fetch_readme(&RepoRef::new("openrocket", "openrocket"))
            .await
            .expect("fetch");

        assert_eq!(record.readme, "# OpenRocket\n");
        assert_eq!(
            record.repo_url,
            format!("{}/repos/openrocket/openrocket", server.uri())
        );
    }

    #[tokio::test]
    async fn missing_readme_is_recorded_without_reusing_previous_content() {
        let server = MockServer::start().await;
        mount_readme(&server, "nasa", "fprime", "F Prime").await;

        Mock::given(method("GET"))
            .and(path("/repos/ghost/empty/readme"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let repos = vec![RepoRef::new("nasa", "fprime"), RepoRef::new("ghost", "empty")];
        let outcome = client.fetch_readmes(&repos).await;

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].readme, "F Prime");
        assert_eq!(
            outcome.failures,
            vec![FetchFailure::ReadmeFetchFailed {
                repo: RepoRef::new("ghost", "empty"),
                status: Some(404),
                message: "HTTP 404 Not Found".into(),
            }]
        );
    }

    #[tokio::test]
    async fn readmes_keep_input_order() {
        let server = MockServer::start().await;

        // The first repository answers last.
        Mock::given(method("GET"))
            .and(path("/repos/slow/one/readme"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(readme_body("first"))
                    .set_delay(Duration::from_millis(200)),
            )
            .mount(&server)
            .await;
        mount_readme(&server, "fast", "two", "second").await;
        mount_readme(&server, "fast", "three", "third").await;

        let client = client_for(&server);
        let repos = vec![
            RepoRef::new("slow", "one"),
            RepoRef::new("fast", "two"),
            RepoRef::new("fast", "three"),
        ];
        let outcome = client.fetch_readmes(&repos).await;

        let bodies: Vec<_> = outcome.records.iter().map(|r| r.readme.as_str()).collect();
        assert_eq!(bodies, ["first", "second", "third"]);
    }

    #[test]
    fn failure_serializes_with_kind() {
        let failure = FetchFailure::SearchFailed {
            term: "space".into(),
            status: Some(500),
            message: "HTTP 500".into(),
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["kind"], "search_failed");
        assert_eq!(json["status"], 500);
    }
}
