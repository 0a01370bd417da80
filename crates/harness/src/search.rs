//! Search execution
//!
//! Builds search requests and hands them to the fetch client. The result body
//! is not interpreted here; scenarios and the pagination walker do that.

use std::collections::BTreeMap;

use crate::error::HarnessResult;
use crate::fetch::FetchClient;
use crate::request::RequestSpec;
use crate::response::ResponseRecord;
use crate::tag::UniquenessTag;

/// How the search is sent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchMethod {
    /// `GET [base]/[type]?query`
    #[default]
    Get,
    /// `POST [base]/[type]/_search` with the query as a form body
    PostForm,
    /// `POST [base]/_search` with the query as a form body
    PostSystem,
}

/// Value of the `Prefer: handling=` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handling {
    Strict,
    Lenient,
}

impl Handling {
    pub fn header_value(&self) -> &'static str {
        match self {
            Handling::Strict => "handling=strict",
            Handling::Lenient => "handling=lenient",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub method: SearchMethod,
    pub handling: Option<Handling>,
    pub authorized: bool,
    pub headers: BTreeMap<String, String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            method: SearchMethod::Get,
            handling: None,
            authorized: true,
            headers: BTreeMap::new(),
        }
    }
}

impl SearchOptions {
    pub fn post() -> Self {
        Self {
            method: SearchMethod::PostForm,
            ..Self::default()
        }
    }

    pub fn handling(mut self, handling: Handling) -> Self {
        self.handling = Some(handling);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct SearchClient {
    client: FetchClient,
    tag_system: String,
}

impl SearchClient {
    pub fn new(client: FetchClient, tag_system: impl Into<String>) -> Self {
        Self {
            client,
            tag_system: tag_system.into(),
        }
    }

    pub fn client(&self) -> &FetchClient {
        &self.client
    }

    /// Run a search such as `Patient?given=Anna&_count=5`
    pub async fn search(
        &self,
        relative_query: &str,
        options: &SearchOptions,
    ) -> HarnessResult<ResponseRecord> {
        self.client.execute(build_request(relative_query, options)).await
    }

    /// Same as [`search`](Self::search), scoped to fixtures carrying `tag`
    pub async fn search_tagged(
        &self,
        relative_query: &str,
        tag: &UniquenessTag,
        options: &SearchOptions,
    ) -> HarnessResult<ResponseRecord> {
        self.search(&self.tagged_query(relative_query, tag), options)
            .await
    }

    /// Append the tag identifier parameter to a query
    pub fn tagged_query(&self, relative_query: &str, tag: &UniquenessTag) -> String {
        let token = format!("{}|{}", self.tag_system, tag);
        let separator = if relative_query.contains('?') {
            if relative_query.ends_with('?') || relative_query.ends_with('&') {
                ""
            } else {
                "&"
            }
        } else {
            "?"
        };
        format!(
            "{}{}identifier={}",
            relative_query,
            separator,
            urlencoding::encode(&token)
        )
    }
}

/// Split `Type?query` into the request the chosen method needs
pub fn build_request(relative_query: &str, options: &SearchOptions) -> RequestSpec {
    let (path, query) = match relative_query.split_once('?') {
        Some((path, query)) => (path, query),
        None => (relative_query, ""),
    };
    let path = path.trim_end_matches('/');

    let mut request = match options.method {
        SearchMethod::Get => RequestSpec::get(relative_query),
        SearchMethod::PostForm => {
            let target = if path.is_empty() {
                "_search".to_string()
            } else {
                format!("{}/_search", path)
            };
            RequestSpec::post_form(target, query)
        }
        SearchMethod::PostSystem => RequestSpec::post_form("_search", query),
    };

    if let Some(handling) = options.handling {
        request = request.with_header("Prefer", handling.header_value());
    }
    for (name, value) in &options.headers {
        request = request.with_header(name.clone(), value.clone());
    }
    if options.authorized {
        request = request.authorized();
    }
    request
}
