//! In-process FHIR server for integration tests
//!
//! Just enough of the REST and search API for the harness to exercise its
//! whole path: create, create-or-replace, read, and type-level search over
//! `identifier`, `given`, `family` and `subject` with `_count`/`_offset`
//! paging. Every request is logged so tests can inspect what was sent.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

use searchcheck_harness::{CapabilityProfile, FetchClient, HarnessConfig, InteractionRecorder};

/// How page links are written into search bundles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStyle {
    /// Absolute, on a host the harness never talks to
    ForeignAbsolute,
    /// `/fhir/Patient?...`
    Rooted,
    /// `Patient?...`
    Relative,
    /// `next` always points back at the first page
    Loop,
}

#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub prefer: Option<String>,
}

#[derive(Debug)]
struct Store {
    resources: Vec<(String, String, Value)>,
    next_id: u64,
    link_style: LinkStyle,
    default_count: usize,
    requests: Vec<SeenRequest>,
    tokens_issued: usize,
}

type Shared = Arc<Mutex<Store>>;

pub struct FakeServer {
    pub base_url: String,
    store: Shared,
}

impl FakeServer {
    pub async fn start() -> Self {
        Self::start_with(LinkStyle::ForeignAbsolute).await
    }

    pub async fn start_with(link_style: LinkStyle) -> Self {
        let store = Arc::new(Mutex::new(Store {
            resources: Vec::new(),
            next_id: 1,
            link_style,
            default_count: 20,
            requests: Vec::new(),
            tokens_issued: 0,
        }));

        let api = Router::new()
            .route("/:kind", get(search_get).post(create))
            .route("/:kind/:id", get(read).put(update).post(search_post))
            .with_state(store.clone());
        let app = Router::new()
            .route("/oauth/token", post(token).with_state(store.clone()))
            .nest("/fhir", api);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}/fhir", addr),
            store,
        }
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.store.lock().requests.clone()
    }

    /// OAuth2 token endpoint accepting `searchcheck` / `secret`
    pub fn token_url(&self) -> String {
        self.base_url.replace("/fhir", "/oauth/token")
    }

    pub fn tokens_issued(&self) -> usize {
        self.store.lock().tokens_issued
    }

    pub fn resource_count(&self, kind: &str) -> usize {
        self.store
            .lock()
            .resources
            .iter()
            .filter(|(k, _, _)| k == kind)
            .count()
    }

    /// Harness configuration pointing at this server, results under `output`
    pub fn config(&self, output: &std::path::Path) -> HarnessConfig {
        HarnessConfig {
            base_url: self.base_url.clone(),
            output_dir: output.to_path_buf(),
            verbose_errors: false,
            ..HarnessConfig::default()
        }
    }

    pub fn core_config(&self, output: &std::path::Path) -> HarnessConfig {
        let mut config = self.config(output);
        config.capabilities.profile = CapabilityProfile::Core;
        config
    }

    /// Client with a private recorder, so parallel tests don't share a log
    pub fn client(&self, config: &HarnessConfig) -> FetchClient {
        FetchClient::new(config)
            .unwrap()
            .with_recorder(InteractionRecorder::new())
    }
}

/// A port nothing listens on
pub async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn log(store: &Shared, method: &str, path: String, query: Option<String>, headers: &HeaderMap) {
    store.lock().requests.push(SeenRequest {
        method: method.to_string(),
        path,
        query,
        authorization: header(headers, "authorization"),
        content_type: header(headers, "content-type"),
        prefer: header(headers, "prefer"),
    });
}

fn fhir(status: StatusCode, body: Value) -> Response {
    (
        status,
        [("content-type", "application/fhir+json")],
        body.to_string(),
    )
        .into_response()
}

fn outcome(status: StatusCode, code: &str, diagnostics: &str) -> Response {
    fhir(
        status,
        json!({
            "resourceType": "OperationOutcome",
            "issue": [{"severity": "error", "code": code, "diagnostics": diagnostics}]
        }),
    )
}

fn parse_body(kind: &str, body: &Bytes) -> Result<Value, Response> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| outcome(StatusCode::BAD_REQUEST, "structure", &e.to_string()))?;
    if value["resourceType"] != kind {
        return Err(outcome(
            StatusCode::BAD_REQUEST,
            "invalid",
            "resourceType does not match the request path",
        ));
    }
    Ok(value)
}

fn stamp(mut resource: Value, id: &str) -> Value {
    resource["id"] = json!(id);
    resource["meta"] = json!({"versionId": "1", "lastUpdated": "2026-01-01T00:00:00Z"});
    resource
}

async fn create(
    State(store): State<Shared>,
    Path(kind): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    log(&store, "POST", kind.clone(), None, &headers);
    let resource = match parse_body(&kind, &body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    let mut guard = store.lock();
    let id = format!("fake{}", guard.next_id);
    guard.next_id += 1;
    let resource = stamp(resource, &id);
    guard.resources.push((kind, id, resource.clone()));
    fhir(StatusCode::CREATED, resource)
}

async fn update(
    State(store): State<Shared>,
    Path((kind, id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    log(&store, "PUT", format!("{}/{}", kind, id), None, &headers);
    let resource = match parse_body(&kind, &body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    if resource.get("id").and_then(Value::as_str) != Some(id.as_str()) {
        return outcome(StatusCode::BAD_REQUEST, "invalid", "body id does not match URL id");
    }

    let resource = stamp(resource, &id);
    let mut guard = store.lock();
    let existing = guard
        .resources
        .iter()
        .position(|(k, i, _)| *k == kind && *i == id);
    let status = match existing {
        Some(index) => {
            guard.resources[index].2 = resource.clone();
            StatusCode::OK
        }
        None => {
            guard.resources.push((kind, id, resource.clone()));
            StatusCode::CREATED
        }
    };
    fhir(status, resource)
}

async fn read(
    State(store): State<Shared>,
    Path((kind, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    log(&store, "GET", format!("{}/{}", kind, id), None, &headers);
    let guard = store.lock();
    match guard.resources.iter().find(|(k, i, _)| *k == kind && *i == id) {
        Some((_, _, resource)) => fhir(StatusCode::OK, resource.clone()),
        None => outcome(StatusCode::NOT_FOUND, "not-found", "no such resource"),
    }
}

async fn search_get(
    State(store): State<Shared>,
    Path(kind): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    log(&store, "GET", kind.clone(), query.clone(), &headers);
    let params = parse_params(query.as_deref().unwrap_or(""));
    search(&store, &kind, params, &headers)
}

async fn search_post(
    State(store): State<Shared>,
    Path((kind, action)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let form = String::from_utf8_lossy(&body).to_string();
    log(&store, "POST", format!("{}/{}", kind, action), Some(form.clone()), &headers);
    if action != "_search" {
        return outcome(StatusCode::METHOD_NOT_ALLOWED, "not-supported", "POST to an instance");
    }
    search(&store, &kind, parse_params(&form), &headers)
}

async fn token(State(store): State<Shared>, body: Bytes) -> Response {
    let form = parse_params(&String::from_utf8_lossy(&body));
    let field = |name: &str| {
        form.iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    };
    if field("grant_type") != Some("client_credentials")
        || field("client_id") != Some("searchcheck")
        || field("client_secret") != Some("secret")
    {
        return (StatusCode::UNAUTHORIZED, "invalid_client").into_response();
    }

    let mut guard = store.lock();
    guard.tokens_issued += 1;
    axum::Json(json!({
        "access_token": format!("cc-token-{}", guard.tokens_issued),
        "token_type": "Bearer",
        "expires_in": 3600
    }))
    .into_response()
}

fn parse_params(query: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn strings<'a>(value: &'a Value, pointer: &str) -> Vec<&'a str> {
    match value.pointer(pointer) {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => vec![],
    }
}

fn name_parts<'a>(resource: &'a Value, part: &str) -> Vec<&'a str> {
    resource["name"]
        .as_array()
        .map(|names| {
            names
                .iter()
                .flat_map(|n| strings(n, &format!("/{}", part)))
                .collect()
        })
        .unwrap_or_default()
}

fn matches_identifier(resource: &Value, token: &str) -> bool {
    let (system, value) = match token.split_once('|') {
        Some((s, v)) => (Some(s), v),
        None => (None, token),
    };
    resource["identifier"]
        .as_array()
        .map(|ids| {
            ids.iter().any(|id| {
                id["value"] == value && system.map_or(true, |s| id["system"] == s)
            })
        })
        .unwrap_or(false)
}

fn matches_prefix(parts: &[&str], wanted: &str) -> bool {
    let wanted = wanted.to_lowercase();
    parts.iter().any(|p| p.to_lowercase().starts_with(&wanted))
}

/// `Some(matches)` for a known parameter, `None` for an unknown one
fn matches(resource: &Value, name: &str, value: &str) -> Option<bool> {
    let any = |f: &dyn Fn(&str) -> bool| value.split(',').any(f);
    Some(match name {
        "identifier" => any(&|v| matches_identifier(resource, v)),
        "given" => any(&|v| matches_prefix(&name_parts(resource, "given"), v)),
        "family" => any(&|v| matches_prefix(&name_parts(resource, "family"), v)),
        "subject" => any(&|v| resource["subject"]["reference"] == v),
        "url" => any(&|v| resource["url"] == v),
        _ => return None,
    })
}

fn search(store: &Shared, kind: &str, params: Vec<(String, String)>, headers: &HeaderMap) -> Response {
    let strict = header(headers, "prefer").as_deref() == Some("handling=strict");
    let guard = store.lock();

    let mut count = guard.default_count;
    let mut offset = 0usize;
    let mut filters = Vec::new();
    for (name, value) in &params {
        match name.as_str() {
            "_count" => count = value.parse().unwrap_or(count),
            "_offset" => offset = value.parse().unwrap_or(0),
            "_total" => {}
            "identifier" | "given" | "family" | "subject" | "url" => filters.push((name, value)),
            _ if strict => {
                return outcome(
                    StatusCode::BAD_REQUEST,
                    "not-supported",
                    &format!("unknown search parameter {}", name),
                )
            }
            _ => {}
        }
    }

    let hits: Vec<&Value> = guard
        .resources
        .iter()
        .filter(|(k, _, _)| k == kind)
        .map(|(_, _, r)| r)
        .filter(|r| filters.iter().all(|(n, v)| matches(r, n, v) == Some(true)))
        .collect();
    let total = hits.len();

    let page: Vec<Value> = if count == 0 {
        vec![]
    } else {
        hits.iter()
            .skip(offset)
            .take(count)
            .map(|r| {
                json!({
                    "fullUrl": format!("{}/{}", kind, r["id"].as_str().unwrap_or_default()),
                    "resource": r,
                    "search": {"mode": "match"}
                })
            })
            .collect()
    };

    let link_for = |at: usize| -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (name, value) in params.iter().filter(|(n, _)| n != "_offset") {
            query.append_pair(name, value);
        }
        query.append_pair("_offset", &at.to_string());
        let query = query.finish();
        match guard.link_style {
            LinkStyle::ForeignAbsolute => {
                format!("https://fhir.internal:9443/fhir/{}?{}", kind, query)
            }
            LinkStyle::Rooted => format!("/fhir/{}?{}", kind, query),
            LinkStyle::Relative | LinkStyle::Loop => format!("{}?{}", kind, query),
        }
    };

    let mut links = vec![json!({"relation": "self", "url": link_for(offset)})];
    if count > 0 {
        if guard.link_style == LinkStyle::Loop {
            links.push(json!({"relation": "next", "url": link_for(0)}));
        } else if offset + count < total {
            links.push(json!({"relation": "next", "url": link_for(offset + count)}));
        }
        if offset > 0 {
            links.push(json!({"relation": "previous", "url": link_for(offset.saturating_sub(count))}));
        }
        let last = if total == 0 { 0 } else { (total - 1) / count * count };
        links.push(json!({"relation": "last", "url": link_for(last)}));
    }

    fhir(
        StatusCode::OK,
        json!({
            "resourceType": "Bundle",
            "type": "searchset",
            "total": total,
            "link": links,
            "entry": page
        }),
    )
}
