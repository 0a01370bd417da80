//! Built-in scenario catalogue
//!
//! Each scenario creates its own fixtures under the context's uniqueness tag
//! and scopes every search by that tag, so the catalogue can run against a
//! server that already holds unrelated data.

mod fixtures;
mod handling;
mod joins;
mod paging;
mod references;

pub use fixtures::{FixtureEcho, IdempotentSearch, KnownResource, TaggedRoundTrip};
pub use handling::{PostSearchEquivalence, StrictLenientHandling};
pub use joins::GivenJoins;
pub use paging::{CountPaging, CountZero, MultiPageTotal};
pub use references::ObservationSubject;

use crate::error::HarnessResult;
use crate::fixture::{Fixture, PatientOptions, ResourceFactory};
use crate::runner::Scenario;

/// Every built-in scenario, in run order
pub fn catalogue() -> Vec<Box<dyn Scenario>> {
    vec![
        Box::new(FixtureEcho),
        Box::new(KnownResource),
        Box::new(TaggedRoundTrip),
        Box::new(IdempotentSearch),
        Box::new(GivenJoins),
        Box::new(CountPaging),
        Box::new(CountZero),
        Box::new(MultiPageTotal),
        Box::new(PostSearchEquivalence),
        Box::new(StrictLenientHandling),
        Box::new(ObservationSubject),
    ]
}

/// `count` plain patients under the factory's tag
pub(crate) async fn patients(factory: &ResourceFactory, count: usize) -> HarnessResult<Vec<Fixture>> {
    let mut created = Vec::with_capacity(count);
    for i in 0..count {
        let options = PatientOptions::new()
            .family(factory.tag().label("Fixture"))
            .given(format!("P{}", i));
        created.push(factory.patient(options).await?);
    }
    Ok(created)
}

pub(crate) fn ids(fixtures: &[Fixture]) -> Vec<String> {
    fixtures.iter().map(|f| f.id.clone()).collect()
}
