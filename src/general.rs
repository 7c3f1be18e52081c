use crate::bidder::{Bidder, FractionalBidder};
use crate::ledger::Price;
use crate::lot::{Claim, Lot};
use crate::numeric::AuctionParams;
use crate::solution::{AuctionSolution, Edge, Flow, Side, UnsignedInt};
use crate::solver::{ensure_coverable, index, validate_problem, AuctionSolver};
use anyhow;
use anyhow::Result;
use num_iter;
use tracing::{info, trace};

/// Auction over fractional weights.
///
/// Every demand node bids for its whole missing weight on one lot per round. Lots accept any
/// number of partial claims up to their capacity and evict the weakest claims first.
#[derive(Debug, Clone)]
pub struct GeneralAuction<I: UnsignedInt> {
    params: AuctionParams,
    bidders: Vec<FractionalBidder<I>>,
    lots: Vec<Lot<I>>,
    prices: Vec<Price<I>>,
    claims: Vec<Claim<I>>,
}

impl<I: UnsignedInt> AuctionSolver<I> for GeneralAuction<I> {
    fn new(
        demand: &[f64],
        supply: &[f64],
        arcs: &[Vec<Edge<I>>],
        params: AuctionParams,
    ) -> Result<Self, anyhow::Error> {
        validate_problem(demand, supply, arcs, &params)?;
        let mut solver = GeneralAuction {
            params,
            bidders: Vec::new(),
            lots: Vec::new(),
            prices: Vec::new(),
            claims: Vec::new(),
        };
        if demand.is_empty() || supply.is_empty() {
            return Ok(solver);
        }
        ensure_coverable(
            demand.iter().sum(),
            supply.iter().sum(),
            params.tolerance,
        )?;

        let num_lots = index::<I>(supply.len())?;
        for (lot, capacity) in num_iter::range(I::zero(), num_lots).zip(supply.iter()) {
            solver.lots.push(Lot::new(lot, *capacity, params.tolerance));
            solver.prices.push(Price::new(lot));
        }
        let num_bidders = index::<I>(demand.len())?;
        for ((bidder, capacity), row_arcs) in num_iter::range(I::zero(), num_bidders)
            .zip(demand.iter())
            .zip(arcs.iter())
        {
            solver.bidders.push(FractionalBidder::new(
                bidder,
                *capacity,
                row_arcs.clone(),
                params.tolerance,
            ));
        }
        solver.claims.reserve(demand.len());
        info!(
            "general auction size: {} bidders, {} lots",
            solver.bidders.len(),
            solver.lots.len()
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
        self.lots.len()
    }

    fn refresh(&mut self, eps: f64) {
        self.prices
            .iter_mut()
            .for_each(|price| price.owner = I::none());
        self.bidders.iter_mut().for_each(|b| b.refresh(eps));
        self.lots.iter_mut().for_each(|lot| lot.refresh());
    }

    fn bid_and_assign(&mut self) {
        let prices = &self.prices;
        self.claims.clear();
        self.claims
            .extend(self.bidders.iter().filter_map(|b| b.make_claim(prices)));
        trace!("claims {:?}", self.claims);

        for claim in self.claims.iter() {
            let lot: usize = claim.lot.as_();
            self.lots[lot].update_claim(*claim, &mut self.prices[lot], &mut self.bidders);
        }
        trace!("prices {:?}", self.prices);
        trace!(
            "free weight {:?}",
            self.lots
                .iter()
                .filter(|lot| lot.is_active())
                .map(|lot| lot.free())
                .collect::<Vec<_>>()
        );
    }

    fn any_active(&self) -> bool {
        self.bidders.iter().any(|b| b.is_active())
    }

    fn assemble(&self, eps: f64, nits: u32, nreductions: u32) -> AuctionSolution<I> {
        let mut plan: Vec<Flow<I>> = Vec::with_capacity(self.lots.len());
        let mut held: Vec<(I, f64)> = Vec::new();
        for (lot, price) in self.lots.iter().zip(self.prices.iter()) {
            held.clear();
            held.extend(lot.claims().iter().map(|c| (c.bidder, c.weight)));
            held.sort_by(|a, b| a.0.cmp(&b.0));

            let start = plan.len();
            for (bidder, weight) in held.iter() {
                let merged = match plan[start..].last_mut() {
                    Some(last) if last.source == Some(*bidder) => {
                        last.amount += weight;
                        true
                    }
                    _ => false,
                };
                if !merged {
                    plan.push(Flow {
                        amount: *weight,
                        source: Some(*bidder),
                        sink: price.lot,
                    });
                }
            }
            if plan.len() == start {
                plan.push(Flow {
                    amount: 0.,
                    source: None,
                    sink: price.lot,
                });
            }
        }
        AuctionSolution {
            plan,
            prices: self.prices.iter().map(|p| p.value).collect(),
            priced: Side::Supply,
            eps,
            nits,
            nreductions,
        }
    }
}
