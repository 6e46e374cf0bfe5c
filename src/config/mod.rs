pub mod applicator;
pub mod loader;
pub mod schema;

pub use applicator::{stage_plan, StagedPlan};
pub use loader::{load_from_path, load_from_str, ConfigError};
pub use schema::{
    Metadata, ReplacePlan, RuleDefinition, RuleMode, RuleScope, ValidationError, ValidationIssue,
};
