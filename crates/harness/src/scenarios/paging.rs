//! `_count`, `_total` and page links

use async_trait::async_trait;
use std::collections::HashSet;

use super::{ids, patients};
use crate::bundle::Bundle;
use crate::capability::Capability;
use crate::check;
use crate::error::HarnessResult;
use crate::pagination::{check_zero_count_page, Page};
use crate::runner::{Scenario, ScenarioContext};
use crate::search::SearchOptions;

pub struct CountPaging;

#[async_trait]
impl Scenario for CountPaging {
    fn name(&self) -> &'static str {
        "count-paging"
    }

    fn description(&self) -> &'static str {
        "_count=5 over 10 matches gives two full pages linked by next"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["paging"]
    }

    fn requires(&self) -> &'static [Capability] {
        &[Capability::TotalAccurate]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> HarnessResult<()> {
        let created = patients(&ctx.factory, 10).await?;

        let record = ctx
            .search
            .search_tagged("Patient?_count=5&_total=accurate", &ctx.tag, &SearchOptions::default())
            .await?;
        let first = Page::from_response(record)?;
        check::equal(first.bundle.total, Some(10), "total")?;
        check::equal(first.bundle.match_count(), 5, "first page matches")?;
        check::ensure(first.bundle.next_link().is_some(), "first page has no next link")?;

        let second = ctx
            .walker
            .next_page(&first)
            .await?
            .ok_or_else(|| crate::HarnessError::AssertionFailed("next page vanished".into()))?;
        check::equal(second.bundle.match_count(), 5, "second page matches")?;
        check::ensure(
            second.bundle.next_link().is_none(),
            "last page still has a next link",
        )?;

        let mut seen: Vec<String> = first.bundle.match_ids();
        seen.extend(second.bundle.match_ids());
        check::same_ids(&seen, &ids(&created), "ids across pages")
    }
}

pub struct CountZero;

#[async_trait]
impl Scenario for CountZero {
    fn name(&self) -> &'static str {
        "count-zero"
    }

    fn description(&self) -> &'static str {
        "_count=0 reports the total with no entries and no page links"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["paging"]
    }

    fn requires(&self) -> &'static [Capability] {
        &[Capability::TotalAccurate]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> HarnessResult<()> {
        patients(&ctx.factory, 3).await?;

        let record = ctx
            .search
            .search_tagged("Patient?_count=0&_total=accurate", &ctx.tag, &SearchOptions::default())
            .await?;
        check::success(&record)?;
        let bundle: Bundle = record.bundle()?;
        check::equal(bundle.total, Some(3), "total")?;
        check_zero_count_page(&bundle)
    }
}

/// Walk every page and reconcile the entries with the reported total
pub struct MultiPageTotal;

const WALK_FIXTURES: usize = 7;
const WALK_PAGE_SIZE: usize = 3;

#[async_trait]
impl Scenario for MultiPageTotal {
    fn name(&self) -> &'static str {
        "multi-page-total"
    }

    fn description(&self) -> &'static str {
        "entries summed over all pages equal the reported total"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["paging"]
    }

    fn requires(&self) -> &'static [Capability] {
        &[Capability::TotalAccurate]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> HarnessResult<()> {
        let created = patients(&ctx.factory, WALK_FIXTURES).await?;

        let query = format!("Patient?_count={}&_total=accurate", WALK_PAGE_SIZE);
        let first = ctx
            .search
            .search_tagged(&query, &ctx.tag, &SearchOptions::default())
            .await?;
        let traversal = ctx.walker.walk(first).await?;

        traversal.check_total()?;
        check::equal(
            traversal.page_count(),
            ctx.walker.expected_pages(WALK_FIXTURES, Some(WALK_PAGE_SIZE)),
            "pages",
        )?;

        let ids_seen = traversal.resource_ids();
        let unique: HashSet<&String> = ids_seen.iter().collect();
        check::equal(unique.len(), ids_seen.len(), "distinct ids across pages")?;
        check::same_ids(&ids_seen, &ids(&created), "walked ids")
    }
}
