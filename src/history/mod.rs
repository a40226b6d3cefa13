pub mod coverage;
pub mod resolver;

pub use coverage::{check_coverage, CoverageDecision, CoverageReason, RequestedRange};
pub use resolver::StateResolver;
