//! Pagination walker
//!
//! Follows `next` links until a page has none. Servers hand out links in
//! whatever form suits them: relative, rooted at the server (`/fhir/...`), or
//! absolute with a host that may not match the one the harness talks to
//! (proxies, internal hostnames). Every link is rebased onto the configured
//! base before it is fetched, so all pages go to the server under test.

use std::collections::HashSet;
use tracing::debug;
use url::Url;

use crate::bundle::{Bundle, BundleEntry};
use crate::check;
use crate::error::{HarnessError, HarnessResult};
use crate::fetch::FetchClient;
use crate::request::RequestSpec;
use crate::response::ResponseRecord;

/// Turns page links into paths relative to the configured base
#[derive(Debug, Clone)]
pub struct LinkResolver {
    base: Url,
}

impl LinkResolver {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    /// Base path without the trailing slash; empty for a root base
    fn base_path(&self) -> &str {
        self.base.path().trim_end_matches('/')
    }

    pub fn rebase(&self, link: &str) -> HarnessResult<String> {
        let fail = |reason: &str| HarnessError::LinkResolution {
            url: link.to_string(),
            reason: reason.to_string(),
        };

        let link = link.trim();
        if link.is_empty() {
            return Err(fail("link is empty"));
        }

        match Url::parse(link) {
            Ok(url) => {
                if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
                    return Err(fail("not an http(s) URL"));
                }
                if url.origin() != self.base.origin() {
                    debug!("Rebasing link from foreign origin {}", url.origin().ascii_serialization());
                }
                self.strip_base(url.path(), url.query())
                    .ok_or_else(|| fail("path is outside the configured base"))
            }
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                if link.starts_with('/') {
                    let (path, query) = match link.split_once('?') {
                        Some((p, q)) => (p, Some(q)),
                        None => (link, None),
                    };
                    self.strip_base(path, query)
                        .ok_or_else(|| fail("path is outside the configured base"))
                } else {
                    Ok(link.to_string())
                }
            }
            Err(e) => Err(fail(&e.to_string())),
        }
    }

    fn strip_base(&self, path: &str, query: Option<&str>) -> Option<String> {
        let base_path = self.base_path();
        let rest = if base_path.is_empty() {
            path
        } else if path == base_path {
            ""
        } else {
            path.strip_prefix(base_path)?.strip_prefix('/')?
        };
        let rest = rest.trim_start_matches('/');

        Some(match query {
            Some(q) => format!("{}?{}", rest, q),
            None => rest.to_string(),
        })
    }
}

/// One fetched page of a search result
#[derive(Debug, Clone)]
pub struct Page {
    pub response: ResponseRecord,
    pub bundle: Bundle,
}

impl Page {
    pub fn from_response(response: ResponseRecord) -> HarnessResult<Self> {
        if !response.success {
            return Err(HarnessError::AssertionFailed(format!(
                "search page returned status {}: {}",
                response.status,
                crate::response::truncate(&response.body_text, 500)
            )));
        }
        let bundle = response.bundle()?;
        Ok(Self { response, bundle })
    }
}

/// All pages reached from a first page
#[derive(Debug, Clone)]
pub struct Traversal {
    pub pages: Vec<Page>,
}

impl Traversal {
    pub fn first(&self) -> Option<&Page> {
        self.pages.first()
    }

    pub fn last(&self) -> Option<&Page> {
        self.pages.last()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn match_entries(&self) -> impl Iterator<Item = &BundleEntry> {
        self.pages.iter().flat_map(|p| p.bundle.match_entries())
    }

    pub fn match_count(&self) -> usize {
        self.match_entries().count()
    }

    /// `total` from the first page that reports one
    pub fn reported_total(&self) -> Option<u64> {
        self.pages.iter().find_map(|p| p.bundle.total)
    }

    /// Ids of match entries across all pages, in page order
    pub fn resource_ids(&self) -> Vec<String> {
        self.pages.iter().flat_map(|p| p.bundle.match_ids()).collect()
    }

    /// The match entries across all pages add up to the reported total.
    pub fn check_total(&self) -> HarnessResult<()> {
        let total = self.reported_total().ok_or_else(|| {
            HarnessError::AssertionFailed("no page reported a total".into())
        })?;
        check::equal(self.match_count() as u64, total, "match entries across all pages vs total")
    }
}

/// A `_count=0` page carries no entries and no paging links.
pub fn check_zero_count_page(bundle: &Bundle) -> HarnessResult<()> {
    check::ensure(
        bundle.entry.is_empty(),
        format!("_count=0 page has {} entries", bundle.entry.len()),
    )?;
    check::ensure(
        !bundle.has_paging_links(),
        "_count=0 page has next/previous/last links",
    )
}

#[derive(Debug, Clone)]
pub struct PaginationWalker {
    client: FetchClient,
    resolver: LinkResolver,
    page_size: usize,
    max_pages: usize,
}

impl PaginationWalker {
    /// `page_size` is what the server uses when `_count` is absent
    pub fn new(client: FetchClient, page_size: usize, max_pages: usize) -> Self {
        let resolver = LinkResolver::new(client.base().clone());
        Self {
            client,
            resolver,
            page_size,
            max_pages,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Pages needed for `total` matches at `page_size` (or the default)
    pub fn expected_pages(&self, total: usize, page_size: Option<usize>) -> usize {
        let size = page_size.unwrap_or(self.page_size).max(1);
        total.div_ceil(size).max(1)
    }

    pub fn resolver(&self) -> &LinkResolver {
        &self.resolver
    }

    /// Fetch the page `page`'s `next` link points to, if it has one
    pub async fn next_page(&self, page: &Page) -> HarnessResult<Option<Page>> {
        let Some(link) = page.bundle.next_link() else {
            return Ok(None);
        };
        let path = self.resolver.rebase(link)?;
        let response = self.client.execute(RequestSpec::get(path).authorized()).await?;
        Page::from_response(response).map(Some)
    }

    /// Follow `next` links from `first` until a page has none
    pub async fn walk(&self, first: ResponseRecord) -> HarnessResult<Traversal> {
        let first = Page::from_response(first)?;
        let mut visited = HashSet::new();
        if let Some(path) = first
            .bundle
            .link("self")
            .and_then(|link| self.resolver.rebase(link).ok())
        {
            visited.insert(path);
        }
        let mut pages = vec![first];

        loop {
            let current = pages.last().map(|p| &p.bundle);
            let Some(link) = current.and_then(|b| b.next_link()) else {
                break;
            };
            let path = self.resolver.rebase(link)?;
            if !visited.insert(path.clone()) {
                return Err(HarnessError::LinkResolution {
                    url: link.to_string(),
                    reason: "next link points at a page already visited".into(),
                });
            }
            if pages.len() >= self.max_pages {
                return Err(HarnessError::PageLimit(pages.len()));
            }

            debug!("Following next link to {}", path);
            let response = self.client.execute(RequestSpec::get(path).authorized()).await?;
            pages.push(Page::from_response(response)?);
        }

        Ok(Traversal { pages })
    }
}
