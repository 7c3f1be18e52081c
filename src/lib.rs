//! ε-scaling auction solvers for the transportation problem.
//!
//! Demand nodes ship their whole weight along weighted arcs to supply nodes of limited
//! capacity, the plan maximizes the total arc value. Four variants share the
//! [`AuctionSolver`] contract:
//!
//! * [`GeneralAuction`] works with fractional weights directly,
//! * [`AssignmentAuction`] and [`SimilarObjectAuction`] cut integer weights into units,
//! * [`ReverseAuction`] lets the supply side bid for the demand units.

pub mod bidder;
pub mod general;
pub mod graph;
pub mod ledger;
pub mod lot;
pub mod numeric;
pub mod report;
pub mod solution;
pub mod solver;

#[cfg(feature = "unit")]
pub mod assignment;
#[cfg(feature = "unit")]
pub mod decompose;
#[cfg(feature = "unit")]
pub mod reverse;

#[cfg(feature = "unit")]
pub use assignment::{AssignmentAuction, SimilarObjectAuction};
pub use general::GeneralAuction;
pub use graph::Problem;
pub use numeric::{AuctionParams, Tolerance};
pub use report::{evaluate, CostReport};
#[cfg(feature = "unit")]
pub use reverse::ReverseAuction;
pub use solution::{AuctionSolution, Edge, Flow, Side, UnsignedInt};
pub use solver::AuctionSolver;

#[cfg(test)]
pub(crate) fn init() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
