//! Fixture lifecycle and tag scoping

use async_trait::async_trait;

use super::{ids, patients};
use crate::check;
use crate::error::HarnessResult;
use crate::fixture::{
    EncounterOptions, Fixture, OrganizationOptions, PatientOptions, PractitionerOptions,
    ValueSetOptions,
};
use crate::request::RequestSpec;
use crate::runner::{Scenario, ScenarioContext};
use crate::search::SearchOptions;

/// Created resources come back with the fields that were sent
pub struct FixtureEcho;

#[async_trait]
impl Scenario for FixtureEcho {
    fn name(&self) -> &'static str {
        "fixture-echo"
    }

    fn description(&self) -> &'static str {
        "created fixtures echo every submitted field and keep the tag identifier"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["smoke", "fixtures"]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> HarnessResult<()> {
        let factory = &ctx.factory;
        let patient = factory
            .patient(
                PatientOptions::new()
                    .family(ctx.tag.label("Echo"))
                    .given("Ada")
                    .gender("female")
                    .birth_date("1970-01-01"),
            )
            .await?;
        let organization = factory.organization(OrganizationOptions::new()).await?;
        let practitioner = factory
            .practitioner(PractitionerOptions::new().family(ctx.tag.label("Echo")))
            .await?;
        let encounter = factory
            .encounter(
                EncounterOptions::new(patient.reference())
                    .service_provider(organization.reference()),
            )
            .await?;
        let value_set = factory.value_set(ValueSetOptions::new().version("1.0.0")).await?;

        for fixture in [&patient, &organization, &practitioner, &encounter, &value_set] {
            let diverging = fixture.diverging_fields();
            check::ensure(
                diverging.is_empty(),
                format!("{} did not echo {:?}", fixture.reference(), diverging),
            )?;
            check_tagged(fixture, ctx.factory.tag_system(), ctx.tag.as_str())?;
        }

        let read = ctx
            .client
            .execute(RequestSpec::get(patient.reference()).authorized())
            .await?;
        check::status(&read, 200)?;
        check::equal(read.resource_id(), Some(patient.id.as_str()), "read id")
    }
}

fn check_tagged(fixture: &Fixture, system: &str, tag: &str) -> HarnessResult<()> {
    let tagged = fixture
        .get("identifier")
        .and_then(|v| v.as_array())
        .map(|ids| {
            ids.iter()
                .any(|id| id["system"] == system && id["value"] == tag)
        })
        .unwrap_or(false);
    check::ensure(
        tagged,
        format!("{} lost its tag identifier", fixture.reference()),
    )
}

/// The configured known resource can be put in place and read back
pub struct KnownResource;

#[async_trait]
impl Scenario for KnownResource {
    fn name(&self) -> &'static str {
        "known-resource"
    }

    fn description(&self) -> &'static str {
        "the configured known resource exists after create-or-replace"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["smoke", "fixtures"]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> HarnessResult<()> {
        let anchor = ctx.factory.anchor(&ctx.capabilities).await?;
        check::equal(
            anchor.reference().as_str(),
            ctx.capabilities.known_resource(),
            "anchor reference",
        )?;

        let read = ctx
            .client
            .execute(RequestSpec::get(anchor.reference()).authorized())
            .await?;
        check::status(&read, 200)
    }
}

/// A tagged search sees the scenario's fixtures and nothing else
pub struct TaggedRoundTrip;

#[async_trait]
impl Scenario for TaggedRoundTrip {
    fn name(&self) -> &'static str {
        "tagged-round-trip"
    }

    fn description(&self) -> &'static str {
        "a tagged search returns exactly the fixtures created under that tag"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["smoke", "search"]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> HarnessResult<()> {
        let created = patients(&ctx.factory, 2).await?;

        // a sibling group under a derived tag must not leak into the search
        let sibling = ctx.factory.with_tag(ctx.tag.child("other"));
        patients(&sibling, 1).await?;

        let record = ctx
            .search
            .search_tagged("Patient", &ctx.tag, &SearchOptions::default())
            .await?;
        check::success(&record)?;
        let bundle = record.bundle()?;
        for entry in bundle.match_entries() {
            let tagged = entry
                .resource
                .as_ref()
                .and_then(|r| r.get("identifier"))
                .and_then(|v| v.as_array())
                .is_some_and(|ids| ids.iter().any(|id| id["value"] == ctx.tag.as_str()));
            check::ensure(
                tagged,
                format!("entry {:?} does not carry the tag", entry.resource_id()),
            )?;
        }
        check::same_ids(&bundle.match_ids(), &ids(&created), "tagged search")
    }
}

/// Repeating a search returns the same matches
pub struct IdempotentSearch;

#[async_trait]
impl Scenario for IdempotentSearch {
    fn name(&self) -> &'static str {
        "idempotent-search"
    }

    fn description(&self) -> &'static str {
        "the same tagged search twice yields the same match set"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["search"]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> HarnessResult<()> {
        patients(&ctx.factory, 3).await?;
        let options = SearchOptions::default();

        let first = ctx.search.search_tagged("Patient", &ctx.tag, &options).await?;
        check::success(&first)?;
        let second = ctx.search.search_tagged("Patient", &ctx.tag, &options).await?;
        check::success(&second)?;

        let first_ids = first.bundle()?.match_ids();
        check::equal(first_ids.len(), 3, "matches")?;
        check::same_ids(&second.bundle()?.match_ids(), &first_ids, "repeated search")
    }
}
