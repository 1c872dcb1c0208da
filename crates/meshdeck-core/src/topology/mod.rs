// ── Relay and gateway topology ──
//
// `eligibility` decides which nodes may take a role; `ops` runs the
// two-step changes that move nodes between roles.

pub mod eligibility;
pub(crate) mod ops;

pub use eligibility::{Assignability, BlockReason, Candidate, Role, candidates};
