use async_trait::async_trait;

use crate::check;
use crate::error::HarnessResult;
use crate::fixture::{ObservationOptions, PatientOptions};
use crate::runner::{Scenario, ScenarioContext};
use crate::search::SearchOptions;

/// `Observation?subject=Patient/x` returns only that patient's observations
pub struct ObservationSubject;

#[async_trait]
impl Scenario for ObservationSubject {
    fn name(&self) -> &'static str {
        "observation-subject"
    }

    fn description(&self) -> &'static str {
        "a reference search on subject returns the observations of that patient only"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["search", "references"]
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> HarnessResult<()> {
        let patient = ctx.factory.patient(PatientOptions::new()).await?;
        let other = ctx.factory.patient(PatientOptions::new()).await?;

        let mut expected = Vec::new();
        for value in [72.0, 80.0] {
            let obs = ctx
                .factory
                .observation(ObservationOptions::new(patient.reference()).value_quantity(value, "/min"))
                .await?;
            expected.push(obs.id);
        }
        ctx.factory
            .observation(ObservationOptions::new(other.reference()).value_quantity(64.0, "/min"))
            .await?;

        let record = ctx
            .search
            .search_tagged(
                &format!("Observation?subject={}", patient.reference()),
                &ctx.tag,
                &SearchOptions::default(),
            )
            .await?;
        check::success(&record)?;
        check::same_ids(&record.bundle()?.match_ids(), &expected, "observations of subject")
    }
}
