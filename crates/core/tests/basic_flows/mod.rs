//! Basic flow tests for the core crate.
//! These tests drive stakeholders through the evaluator end to end.

mod evaluator_flows;
mod stakeholder_flows;

// Re-export test modules for easier access
pub use evaluator_flows::*;
pub use stakeholder_flows::*;
