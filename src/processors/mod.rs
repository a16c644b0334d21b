pub mod bulk_collector;
pub mod city_selector;
pub mod integrator;
pub mod validator;

pub use bulk_collector::{BulkCollector, CollectionResult};
pub use city_selector::{CitySelector, ReferenceAudit};
pub use integrator::{Integrator, MergeOutcome, MergeReport};
pub use validator::{
    ColumnCompleteness, ValidationOutcome, ValidationReport, Validator, Violation, ViolationType,
};
