//! Fetch client
//!
//! The single path every scenario request takes to the server under test.
//! One call, one network attempt, one recorded interaction. Transport
//! failures come back as a [`ResponseRecord`] with status `-1`; only
//! problems detected before anything is sent (a malformed URL, a token that
//! could not be obtained) are returned as errors.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::TokenProvider;
use crate::bundle::OperationOutcome;
use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::recorder::InteractionRecorder;
use crate::request::{RequestSpec, FHIR_JSON};
use crate::response::{truncate, Outcome, ResponseRecord};

#[derive(Clone)]
pub struct FetchClient {
    base: Url,
    http: reqwest::Client,
    tokens: Option<Arc<dyn TokenProvider>>,
    recorder: InteractionRecorder,
    trace: bool,
    verbose_errors: bool,
}

impl FetchClient {
    /// Build a client from configuration. Interactions go to the global
    /// recorder unless [`with_recorder`](Self::with_recorder) says otherwise.
    pub fn new(config: &HarnessConfig) -> HarnessResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base: normalize_base(&config.base_url)?,
            http,
            tokens: config.auth.provider(),
            recorder: InteractionRecorder::global().clone(),
            trace: config.trace,
            verbose_errors: config.verbose_errors,
        })
    }

    pub fn with_recorder(mut self, recorder: InteractionRecorder) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn with_token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.tokens = Some(provider);
        self
    }

    /// Base URL, always ending in `/`
    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn recorder(&self) -> &InteractionRecorder {
        &self.recorder
    }

    /// Resolve a request path. Absolute `http(s)` URLs pass through; anything
    /// else is joined onto the base, a leading `/` included.
    pub fn resolve(&self, path: &str) -> HarnessResult<Url> {
        let invalid = |reason: String| HarnessError::InvalidUrl {
            url: path.to_string(),
            reason,
        };

        // query values may themselves be URLs
        let target = path.split(['?', '#']).next().unwrap_or(path);
        if target.starts_with("http://") || target.starts_with("https://") {
            return Url::parse(path).map_err(|e| invalid(e.to_string()));
        }
        if target.contains("://") {
            return Err(invalid("only http and https URLs are supported".into()));
        }

        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| invalid(e.to_string()))
    }

    /// Execute a request exactly once and record it
    pub async fn execute(&self, request: RequestSpec) -> HarnessResult<ResponseRecord> {
        let started = Instant::now();

        let url = match self.resolve(&request.path) {
            Ok(url) => url,
            Err(e) => {
                let url = request.path.clone();
                self.recorder
                    .record(request, url, Outcome::transport(e.to_string()), 0);
                return Err(e);
            }
        };

        let token = if request.authorized {
            match self.token().await {
                Ok(token) => token,
                Err(e) => {
                    self.recorder.record(
                        request,
                        url.to_string(),
                        Outcome::transport(e.to_string()),
                        elapsed_ms(started),
                    );
                    return Err(e);
                }
            }
        } else {
            None
        };

        let outcome = self.send(&request, url.clone(), token).await;
        let record = ResponseRecord::from_outcome(&outcome);
        let elapsed = elapsed_ms(started);

        if self.trace {
            info!(
                method = %request.method,
                url = %url,
                status = record.status,
                elapsed_ms = elapsed,
                "fetch"
            );
        }
        if self.verbose_errors && !record.success {
            log_failure(&request, &url, &record);
        }

        self.recorder
            .record(request, url.to_string(), outcome, elapsed);
        Ok(record)
    }

    async fn token(&self) -> HarnessResult<Option<String>> {
        match &self.tokens {
            Some(provider) => provider.get_token().await.map(Some),
            None => {
                debug!("Request marked authorized but no token provider is configured");
                Ok(None)
            }
        }
    }

    async fn send(&self, request: &RequestSpec, url: Url, token: Option<String>) -> Outcome {
        let mut builder = self.http.request(request.method.into(), url);

        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.has_header("content-type") {
            builder = builder.header(reqwest::header::CONTENT_TYPE, FHIR_JSON);
        }
        if !request.has_header("accept") {
            builder = builder.header(reqwest::header::ACCEPT, FHIR_JSON);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let resp = match builder.send().await {
            Ok(resp) => resp,
            Err(e) => return Outcome::transport(describe_transport_error(&e)),
        };

        let status = resp.status().as_u16();
        let headers = collect_headers(resp.headers());
        match resp.text().await {
            Ok(body) => Outcome::Response {
                status,
                headers,
                body,
            },
            Err(e) => Outcome::transport(format!("reading response body failed: {}", e)),
        }
    }
}

impl std::fmt::Debug for FetchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchClient")
            .field("base", &self.base.as_str())
            .field("authorized", &self.tokens.is_some())
            .field("trace", &self.trace)
            .finish()
    }
}

/// Parse the base URL and make sure relative joins land underneath it.
pub(crate) fn normalize_base(base_url: &str) -> HarnessResult<Url> {
    let mut url = Url::parse(base_url).map_err(|e| HarnessError::InvalidUrl {
        url: base_url.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(HarnessError::InvalidUrl {
            url: base_url.to_string(),
            reason: "URL cannot serve as a base".into(),
        });
    }
    url.set_query(None);
    url.set_fragment(None);
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn collect_headers(map: &reqwest::header::HeaderMap) -> BTreeMap<String, String> {
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in map {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    headers
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("timeout: {}", e)
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}

fn log_failure(request: &RequestSpec, url: &Url, record: &ResponseRecord) {
    if record.is_transport_failure() {
        warn!("{} {} failed without a response: {}", request.method, url, record.body_text);
        return;
    }

    match record.json.as_ref().and_then(OperationOutcome::from_value) {
        Some(outcome) => {
            warn!("{} {} returned {} with OperationOutcome", request.method, url, record.status);
            for issue in &outcome.issue {
                warn!("  {}", issue);
            }
        }
        None => {
            warn!(
                "{} {} returned {}: {}",
                request.method,
                url,
                record.status,
                truncate(&record.body_text, 2000)
            );
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn client(base: &str) -> FetchClient {
        let config = HarnessConfig {
            base_url: base.to_string(),
            ..HarnessConfig::default()
        };
        FetchClient::new(&config)
            .unwrap()
            .with_recorder(InteractionRecorder::new())
    }

    #[test_case("http://h/fhir", "Patient?given=a", "http://h/fhir/Patient?given=a" ; "relative")]
    #[test_case("http://h/fhir/", "Patient/1", "http://h/fhir/Patient/1" ; "base with slash")]
    #[test_case("http://h/fhir", "/Patient", "http://h/fhir/Patient" ; "leading slash stays under base")]
    #[test_case("http://h", "Patient", "http://h/Patient" ; "root base")]
    #[test_case("http://h/fhir", "https://other/fhir/Patient/9", "https://other/fhir/Patient/9" ; "absolute passthrough")]
    fn test_resolve(base: &str, path: &str, expected: &str) {
        assert_eq!(client(base).resolve(path).unwrap().as_str(), expected);
    }

    #[test_case("Observation?code=http://loinc.org|8867-4", "/fhir/Observation", "code", "http://loinc.org|8867-4" ; "token with system url")]
    #[test_case("ValueSet?url=http://example.org/fhir/ValueSet/abc", "/fhir/ValueSet", "url", "http://example.org/fhir/ValueSet/abc" ; "canonical url")]
    #[test_case("Patient?_profile=http://hl7.org/fhir/StructureDefinition/Patient", "/fhir/Patient", "_profile", "http://hl7.org/fhir/StructureDefinition/Patient" ; "profile")]
    #[test_case("?_getpages=abc&next=https://h/fhir", "/fhir/", "next", "https://h/fhir" ; "paging at base")]
    fn test_resolve_url_valued_query(path: &str, url_path: &str, name: &str, value: &str) {
        let url = client("http://h/fhir").resolve(path).unwrap();
        assert_eq!(url.host_str(), Some("h"));
        assert_eq!(url.path(), url_path);
        assert!(url
            .query_pairs()
            .any(|(n, v)| n == name && v == value));
    }

    #[test]
    fn test_resolve_rejects_other_schemes() {
        let err = client("http://h/fhir").resolve("ftp://h/x").unwrap_err();
        assert!(matches!(err, HarnessError::InvalidUrl { .. }));
    }

    #[test]
    fn test_normalize_base_drops_query() {
        let url = normalize_base("http://h/fhir?x=1#frag").unwrap();
        assert_eq!(url.as_str(), "http://h/fhir/");
        assert!(normalize_base("mailto:a@b").is_err());
    }

    #[tokio::test]
    async fn test_malformed_url_is_recorded_and_raised() {
        let client = client("http://h/fhir");
        let err = client.execute(RequestSpec::get("gopher://x")).await.unwrap_err();
        assert!(matches!(err, HarnessError::InvalidUrl { .. }));
        assert_eq!(client.recorder().len(), 1);
        assert_eq!(client.recorder().dump()[0].outcome.status(), -1);
    }
}
