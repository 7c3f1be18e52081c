use crate::numeric::{AuctionParams, Tolerance};
use crate::solution::{AuctionSolution, Edge, Side, UnsignedInt};
use anyhow;
use anyhow::{anyhow as anyhow_error, ensure, Result};
use tracing::{debug, trace};

/// Uniform contract of all auction variants.
///
/// A solver is built once per problem instance from the demand weights, the supply weights and
/// one arc list per demand node. `solve` runs the ε-scaling loop: every level scales ε down,
/// resets all claims and runs bidding rounds until no bidder is active.
pub trait AuctionSolver<I: UnsignedInt>: Sized {
    fn new(
        demand: &[f64],
        supply: &[f64],
        arcs: &[Vec<Edge<I>>],
        params: AuctionParams,
    ) -> Result<Self, anyhow::Error>;

    fn params(&self) -> &AuctionParams;
    fn num_bidders(&self) -> usize;
    fn num_lots(&self) -> usize;

    /// Side the reported prices belong to
    fn priced(&self) -> Side {
        Side::Supply
    }

    /// Degenerate instances are solved by returning an empty solution.
    fn is_empty(&self) -> bool {
        self.num_bidders() == 0 || self.num_lots() == 0
    }

    /// Starts an ε level: bidders forget their claims, lots forget their owners.
    fn refresh(&mut self, eps: f64);

    /// One bidding round: all active bidders bid against the current prices, then the bids
    /// are resolved in bidder order.
    fn bid_and_assign(&mut self);

    fn any_active(&self) -> bool;

    /// Builds the transport plan and the price vector from the final ε level.
    fn assemble(&self, eps: f64, nits: u32, nreductions: u32) -> AuctionSolution<I>;

    /// Runs rounds until every bidder is satisfied, returns the number of rounds.
    fn run_round(&mut self) -> u32 {
        let mut nits = 0;
        loop {
            self.bid_and_assign();
            nits += 1;
            if !self.any_active() {
                break;
            }
        }
        nits
    }

    fn solve(&mut self) -> AuctionSolution<I> {
        if self.is_empty() {
            return AuctionSolution::empty(self.priced());
        }
        let params = *self.params();
        let mut eps = params.max_eps;
        let mut nits = 0;
        let mut nreductions = 0;
        // at least one level runs, the last one is the first with ε below min_eps
        loop {
            eps *= params.scale;
            self.refresh(eps);
            let rounds = self.run_round();
            nits += rounds;
            nreductions += 1;
            debug!("REDUCTION: eps {} solved in {} rounds", eps, rounds);
            if eps < params.min_eps {
                break;
            }
        }
        trace!("{} rounds over {} levels", nits, nreductions);
        self.assemble(eps, nits, nreductions)
    }
}

/// Converts a position into an index type, keeping it below the `none` sentinel.
pub(crate) fn index<I: UnsignedInt>(value: usize) -> Result<I, anyhow::Error> {
    let none: usize = I::none().as_();
    ensure!(
        value < none,
        "index {} doesn't fit below the max value of type",
        value
    );
    I::from_usize(value).ok_or_else(|| anyhow_error!("index {} overflows the type", value))
}

/// Checks the input shared by all variants.
pub(crate) fn validate_problem<I: UnsignedInt>(
    demand: &[f64],
    supply: &[f64],
    arcs: &[Vec<Edge<I>>],
    params: &AuctionParams,
) -> Result<(), anyhow::Error> {
    params.validate()?;
    ensure!(
        arcs.len() == demand.len(),
        "expected {} arc lists, got {}",
        demand.len(),
        arcs.len()
    );
    index::<I>(demand.len())?;
    index::<I>(supply.len())?;
    for (side, weights) in [("demand", demand), ("supply", supply)] {
        for (node, weight) in weights.iter().enumerate() {
            ensure!(
                weight.is_finite() && *weight >= 0.,
                "{} node {} has invalid weight {}",
                side,
                node,
                weight
            );
        }
    }
    for (row, (row_arcs, weight)) in arcs.iter().zip(demand.iter()).enumerate() {
        ensure!(
            *weight == 0. || !row_arcs.is_empty(),
            "demand node {} with weight {} has no arcs",
            row,
            weight
        );
        for edge in row_arcs.iter() {
            let source: usize = edge.source.as_();
            let sink: usize = edge.sink.as_();
            ensure!(
                source == row,
                "arc {} -> {} is listed for demand node {}",
                edge.source,
                edge.sink,
                row
            );
            ensure!(
                sink < supply.len(),
                "arc {} -> {} leads to an unknown supply node",
                edge.source,
                edge.sink
            );
            ensure!(
                edge.cost.is_finite(),
                "arc {} -> {} has invalid cost {}",
                edge.source,
                edge.sink,
                edge.cost
            );
        }
    }
    Ok(())
}

/// Bidders can only be satisfied when the lots are able to absorb all of their weight.
pub(crate) fn ensure_coverable(
    bidders_total: f64,
    lots_total: f64,
    tolerance: Tolerance,
) -> Result<(), anyhow::Error> {
    ensure!(
        bidders_total <= lots_total || tolerance.equal(bidders_total, lots_total),
        "bidders need {} but lots hold only {}",
        bidders_total,
        lots_total
    );
    Ok(())
}
