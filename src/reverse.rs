use crate::bidder::{Bid, Bidder, MultiUnitBidder};
use crate::decompose::UnitGrid;
use crate::ledger::PriceLedger;
use crate::numeric::AuctionParams;
use crate::solution::{transpose_arcs, AuctionSolution, Edge, Flow, Side, UnsignedInt};
use crate::solver::{ensure_coverable, index, validate_problem, AuctionSolver};
use anyhow;
use anyhow::{ensure, Result};
use num_iter;
use tracing::{info, trace};

/// Auction with the roles of the two sides reversed.
///
/// Supply nodes bid for the units of the demand nodes. A supply node of `k` units bids for all
/// of its missing units in one round and keeps re-bidding for the units it holds. The plan is
/// reported in the demand to supply orientation, prices belong to the demand nodes.
#[derive(Debug, Clone)]
pub struct ReverseAuction<I: UnsignedInt> {
    params: AuctionParams,
    bidders: Vec<MultiUnitBidder<I>>,
    ledger: PriceLedger<I>,
    bids: Vec<Bid<I>>,
    unit_lots: Vec<I>,
    unit: f64,
    num_demand: usize,
}

impl<I: UnsignedInt> AuctionSolver<I> for ReverseAuction<I> {
    fn new(
        demand: &[f64],
        supply: &[f64],
        arcs: &[Vec<Edge<I>>],
        params: AuctionParams,
    ) -> Result<Self, anyhow::Error> {
        validate_problem(demand, supply, arcs, &params)?;
        let mut solver = ReverseAuction {
            params,
            bidders: Vec::new(),
            ledger: PriceLedger::new(Vec::new()),
            bids: Vec::new(),
            unit_lots: Vec::new(),
            unit: 1.,
            num_demand: demand.len(),
        };
        if demand.is_empty() || supply.is_empty() {
            return Ok(solver);
        }
        let grid = match UnitGrid::new(supply, demand, params.tolerance)? {
            Some(grid) => grid,
            None => return Ok(solver),
        };
        let num_bidder_units: u64 = grid.bidder_units().iter().sum();
        ensure_coverable(
            num_bidder_units as f64,
            grid.num_units() as f64,
            params.tolerance,
        )?;

        let transposed = transpose_arcs(arcs, supply.len());
        for ((bidder, units), row_arcs) in num_iter::range(I::zero(), index::<I>(supply.len())?)
            .zip(grid.bidder_units().iter())
            .zip(transposed.iter())
        {
            let unit_arcs = grid.unit_arcs(row_arcs)?;
            let node: usize = bidder.as_();
            ensure!(
                *units == 0 || !unit_arcs.is_empty(),
                "supply node {} with weight {} can't reach any demand",
                bidder,
                supply[node]
            );
            solver
                .bidders
                .push(MultiUnitBidder::new(bidder, *units, unit_arcs));
        }
        let num_units = index::<I>(grid.num_units())?;
        solver.ledger = PriceLedger::new(num_iter::range(I::zero(), num_units));
        solver.unit_lots = grid.unit_lots().to_vec();
        solver.unit = grid.unit();
        solver.bids.reserve(grid.num_units());
        info!(
            "reverse auction size: {} bidders, {} lots",
            solver.bidders.len(),
            solver.ledger.len()
        );
        Ok(solver)
    }

    fn params(&self) -> &AuctionParams {
        &self.params
    }

    fn num_bidders(&self) -> usize {
        self.bidders.len()
    }

    fn num_lots(&self) -> usize {
        self.ledger.len()
    }

    fn priced(&self) -> Side {
        Side::Demand
    }

    fn refresh(&mut self, eps: f64) {
        self.ledger.release_all();
        self.bidders.iter_mut().for_each(|b| b.refresh(eps));
    }

    fn bid_and_assign(&mut self) {
        let prices = self.ledger.prices();
        self.bids.clear();
        for bidder in self.bidders.iter() {
            bidder.make_bids(prices, &mut self.bids);
        }
        trace!("bids {:?}", self.bids);
        self.ledger.apply(&self.bids, &mut self.bidders);
    }

    fn any_active(&self) -> bool {
        self.bidders.iter().any(|b| b.is_active())
    }

    fn assemble(&self, eps: f64, nits: u32, nreductions: u32) -> AuctionSolution<I> {
        let mut plan: Vec<Flow<I>> = self
            .ledger
            .assemble(&self.unit_lots, |bidder| bidder, self.unit)
            .into_iter()
            .filter_map(|flow| {
                flow.source.map(|supply| Flow {
                    amount: flow.amount,
                    source: Some(flow.sink),
                    sink: supply,
                })
            })
            .collect();
        plan.sort_unstable_by_key(|flow| (flow.sink, flow.source));
        AuctionSolution {
            plan,
            prices: self.ledger.lot_prices(&self.unit_lots, self.num_demand),
            priced: Side::Demand,
            eps,
            nits,
            nreductions,
        }
    }
}
