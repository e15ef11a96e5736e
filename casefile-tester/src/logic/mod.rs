pub mod game_tester;
pub mod playability;
pub mod policy;
pub mod reports;
pub mod seeds;
pub mod tester;

pub use game_tester::{
    DEFAULT_CASE_ID, GameTester, PlayabilityMetrics, SimulationPlan, SimulationSummary,
    TesterAssets,
};
pub use playability::{
    PlayabilityAggregate, PlayabilityRecord, aggregate_playability, run_playability_analysis,
    validate_playability_targets,
};
pub use policy::GameplayStrategy;
pub use seeds::{SeedInfo, resolve_seed_inputs};
pub use tester::*;
