//! Search transport and `Prefer: handling`

use async_trait::async_trait;

use super::{ids, patients};
use crate::capability::Capability;
use crate::check;
use crate::error::HarnessResult;
use crate::runner::{Scenario, ScenarioContext};
use crate::search::{Handling, SearchOptions};

/// Parameter no server defines
const UNKNOWN_PARAMETER: &str = "searchcheck-unknown";

pub struct PostSearchEquivalence;

#[async_trait]
impl Scenario for PostSearchEquivalence {
    fn name(&self) -> &'static str {
        "get-post-equivalence"
    }

    fn description(&self) -> &'static str {
        "POST [type]/_search with a form body matches the same GET search"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["search"]
    }

    fn requires(&self) -> &'static [Capability] {
        &[Capability::PostSearch]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> HarnessResult<()> {
        let created = patients(&ctx.factory, 4).await?;
        let query = format!("Patient?family={}", ctx.tag.label("Fixture"));

        let get = ctx
            .search
            .search_tagged(&query, &ctx.tag, &SearchOptions::default())
            .await?;
        check::success(&get)?;
        let post = ctx
            .search
            .search_tagged(&query, &ctx.tag, &SearchOptions::post())
            .await?;
        check::success(&post)?;

        let get_ids = get.bundle()?.match_ids();
        check::same_ids(&get_ids, &ids(&created), "GET search")?;
        check::same_ids(&post.bundle()?.match_ids(), &get_ids, "POST search")
    }
}

/// Strict handling rejects an unknown parameter; lenient handling ignores it
pub struct StrictLenientHandling;

#[async_trait]
impl Scenario for StrictLenientHandling {
    fn name(&self) -> &'static str {
        "strict-lenient-handling"
    }

    fn description(&self) -> &'static str {
        "unknown parameters fail under handling=strict and are ignored under handling=lenient"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["search"]
    }

    fn requires(&self) -> &'static [Capability] {
        &[Capability::LenientHandling]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> HarnessResult<()> {
        let created = patients(&ctx.factory, 1).await?;
        let query = format!("Patient?{}=1", UNKNOWN_PARAMETER);

        let lenient_options = SearchOptions::default().handling(Handling::Lenient);
        let strict_options = SearchOptions::default().handling(Handling::Strict);

        let (lenient, strict) = tokio::join!(
            ctx.search.search_tagged(&query, &ctx.tag, &lenient_options),
            ctx.search.search_tagged(&query, &ctx.tag, &strict_options),
        );
        let (lenient, strict) = (lenient?, strict?);

        check::success(&lenient)?;
        check::same_ids(&lenient.bundle()?.match_ids(), &ids(&created), "lenient search")?;
        check::client_error(&strict)
    }
}
