use async_trait::async_trait;

use crate::check;
use crate::error::HarnessResult;
use crate::fixture::PatientOptions;
use crate::runner::{Scenario, ScenarioContext};
use crate::search::SearchOptions;

/// Comma joins values with OR; a repeated parameter joins with AND.
pub struct GivenJoins;

#[async_trait]
impl Scenario for GivenJoins {
    fn name(&self) -> &'static str {
        "given-and-or"
    }

    fn description(&self) -> &'static str {
        "given=a,b matches either name; given=a&given=b matches only fixtures holding both"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["search"]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> HarnessResult<()> {
        let family = ctx.tag.label("TestFamily");
        let given_a = ctx.tag.label("GivenA");
        let given_b = ctx.tag.label("GivenB");

        let first = ctx
            .factory
            .patient(PatientOptions::new().family(family.clone()).given(given_a.clone()))
            .await?;
        let second = ctx
            .factory
            .patient(PatientOptions::new().family(family.clone()).given(given_b.clone()))
            .await?;

        let options = SearchOptions::default();
        let or_query = format!("Patient?given={},{}", given_a, given_b);
        let and_query = format!("Patient?given={}&given={}", given_a, given_b);

        let or = ctx.search.search_tagged(&or_query, &ctx.tag, &options).await?;
        check::success(&or)?;
        check::same_ids(
            &or.bundle()?.match_ids(),
            &[first.id.clone(), second.id.clone()],
            "given OR",
        )?;

        let and = ctx.search.search_tagged(&and_query, &ctx.tag, &options).await?;
        check::success(&and)?;
        check::equal(and.bundle()?.match_count(), 0, "given AND with no fixture holding both")?;

        let both = ctx
            .factory
            .patient(
                PatientOptions::new()
                    .family(family)
                    .given(given_a)
                    .given(given_b),
            )
            .await?;
        let and = ctx.search.search_tagged(&and_query, &ctx.tag, &options).await?;
        check::success(&and)?;
        check::same_ids(&and.bundle()?.match_ids(), &[both.id], "given AND")
    }
}
