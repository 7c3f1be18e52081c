use crate::bidder::{Bid, Bidder, UnitBidder, UnitEdge};
use crate::decompose::UnitGrid;
use crate::ledger::PriceLedger;
use crate::numeric::AuctionParams;
use crate::solution::{AuctionSolution, Edge, Side, UnsignedInt};
use crate::solver::{ensure_coverable, index, validate_problem, AuctionSolver};
use anyhow;
use anyhow::{ensure, Result};
use num_iter;
use std::sync::Arc;
use tracing::{info, trace};

/// Auction over unit bidders and unit lots.
///
/// Integer weights are cut into units of their greatest common divisor. Every unit of a demand
/// node bids on its own and the units are merged back by their demand node afterwards. With
/// `TIE_AWARE` the runner-up of a bid ignores the other units of the chosen lot.
#[derive(Debug, Clone)]
pub struct UnitAuction<I: UnsignedInt, const TIE_AWARE: bool> {
    params: AuctionParams,
    bidders: Vec<UnitBidder<I>>,
    ledger: PriceLedger<I>,
    bids: Vec<Bid<I>>,
    unit_lots: Vec<I>,
    unit: f64,
    num_supply: usize,
}

/// Assignment auction, the runner-up is the second best unit
pub type AssignmentAuction<I> = UnitAuction<I, false>;

/// Similar object auction, the runner-up is the best unit of another lot
pub type SimilarObjectAuction<I> = UnitAuction<I, true>;

impl<I: UnsignedInt, const TIE_AWARE: bool> UnitAuction<I, TIE_AWARE> {
    fn name() -> &'static str {
        if TIE_AWARE {
            "similar object"
        } else {
            "assignment"
        }
    }
}

impl<I: UnsignedInt, const TIE_AWARE: bool> AuctionSolver<I> for UnitAuction<I, TIE_AWARE> {
    fn new(
        demand: &[f64],
        supply: &[f64],
        arcs: &[Vec<Edge<I>>],
        params: AuctionParams,
    ) -> Result<Self, anyhow::Error> {
        validate_problem(demand, supply, arcs, &params)?;
        let mut solver = UnitAuction {
            params,
            bidders: Vec::new(),
            ledger: PriceLedger::new(Vec::new()),
            bids: Vec::new(),
            unit_lots: Vec::new(),
            unit: 1.,
            num_supply: supply.len(),
        };
        if demand.is_empty() || supply.is_empty() {
            return Ok(solver);
        }
        let grid = match UnitGrid::new(demand, supply, params.tolerance)? {
            Some(grid) => grid,
            None => return Ok(solver),
        };
        let num_bidder_units: u64 = grid.bidder_units().iter().sum();
        ensure_coverable(
            num_bidder_units as f64,
            grid.num_units() as f64,
            params.tolerance,
        )?;

        solver.bidders.reserve(num_bidder_units as usize);
        for ((class, units), row_arcs) in num_iter::range(I::zero(), index::<I>(demand.len())?)
            .zip(grid.bidder_units().iter())
            .zip(arcs.iter())
        {
            if *units == 0 {
                continue;
            }
            // units of one demand node share the arcs
            let unit_arcs: Arc<[UnitEdge<I>]> = grid.unit_arcs(row_arcs)?.into();
            ensure!(
                !unit_arcs.is_empty(),
                "demand node {} only reaches empty supply nodes",
                class
            );
            for _ in 0..*units {
                let id = index::<I>(solver.bidders.len())?;
                solver
                    .bidders
                    .push(UnitBidder::new(id, class, unit_arcs.clone()));
            }
        }
        let num_units = index::<I>(grid.num_units())?;
        solver.ledger = PriceLedger::new(num_iter::range(I::zero(), num_units));
        solver.unit_lots = grid.unit_lots().to_vec();
        solver.unit = grid.unit();
        solver.bids.reserve(solver.bidders.len());
        info!(
            "{} auction size: {} bidders, {} lots",
            Self::name(),
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

    fn refresh(&mut self, eps: f64) {
        self.ledger.release_all();
        self.bidders.iter_mut().for_each(|b| b.refresh(eps));
    }

    fn bid_and_assign(&mut self) {
        let prices = self.ledger.prices();
        self.bids.clear();
        self.bids.extend(self.bidders.iter().filter_map(|b| {
            if TIE_AWARE {
                b.make_tie_aware_bid(prices)
            } else {
                b.make_bid(prices)
            }
        }));
        trace!("bids {:?}", self.bids);
        self.ledger.apply(&self.bids, &mut self.bidders);
    }

    fn any_active(&self) -> bool {
        self.bidders.iter().any(|b| b.is_active())
    }

    fn assemble(&self, eps: f64, nits: u32, nreductions: u32) -> AuctionSolution<I> {
        let class_of = |bidder: I| {
            let bidder: usize = bidder.as_();
            self.bidders[bidder].class()
        };
        AuctionSolution {
            plan: self.ledger.assemble(&self.unit_lots, class_of, self.unit),
            prices: self.ledger.lot_prices(&self.unit_lots, self.num_supply),
            priced: Side::Supply,
            eps,
            nits,
            nreductions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AssignmentAuction, SimilarObjectAuction, UnitAuction};
    use crate::bidder::{Bid, Bidder};
    use crate::numeric::AuctionParams;
    use crate::report::evaluate;
    use crate::solution::{Edge, Flow, Side};
    use crate::solver::AuctionSolver;
    use rand::distributions::{Distribution, Uniform};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn swapped() -> Vec<Vec<Edge<u32>>> {
        vec![
            vec![Edge::new(1., 0, 0), Edge::new(10., 0, 1)],
            vec![Edge::new(10., 1, 0), Edge::new(1., 1, 1)],
        ]
    }

    fn expected_plan() -> Vec<Flow<u32>> {
        vec![
            Flow {
                amount: 3.,
                source: Some(1),
                sink: 0,
            },
            Flow {
                amount: 6.,
                source: Some(0),
                sink: 1,
            },
        ]
    }

    #[test]
    fn test_assignment_merges_units() {
        crate::init();
        let params = AuctionParams::default().with_max_eps(2.).with_min_eps(0.1);
        let mut solver =
            AssignmentAuction::new(&[6., 3.], &[3., 6.], &swapped(), params).unwrap();
        // demand 6 and 3 with gcd 3 become units 2 and 1
        assert_eq!(solver.num_bidders(), 3);
        assert_eq!(solver.num_lots(), 3);
        assert_eq!(solver.bidders[0].class(), 0);
        assert_eq!(solver.bidders[1].class(), 0);
        assert_eq!(solver.bidders[2].class(), 1);

        let solution = solver.solve();
        assert_eq!(solution.plan, expected_plan());
        assert_eq!(solution.priced, Side::Supply);
        assert_eq!(solution.prices.len(), 2);
        let report = evaluate(&[6., 3.], &[3., 6.], &swapped(), &solution);
        assert_eq!(report.primal, 90.);
        assert!(report.gap() >= -1e-9);
        assert!(report.gap() <= 9. * solution.eps + 1e-9);
    }

    #[test]
    fn test_similar_object_merges_units() {
        crate::init();
        let params = AuctionParams::default().with_max_eps(2.).with_min_eps(0.1);
        let mut solver =
            SimilarObjectAuction::new(&[6., 3.], &[3., 6.], &swapped(), params).unwrap();
        let solution = solver.solve();
        assert_eq!(solution.plan, expected_plan());
        let report = evaluate(&[6., 3.], &[3., 6.], &swapped(), &solution);
        assert_eq!(report.primal, 90.);
        assert!(report.gap() <= 9. * solution.eps + 1e-9);
    }

    /// Runs every level by hand, resolving one bid at a time.
    fn check_rounds<const TIE_AWARE: bool>(seed: u64) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let weights = Uniform::from(1..=3);
        let costs = Uniform::from(0..20);
        let demand: Vec<f64> = (0..5).map(|_| weights.sample(&mut rng) as f64).collect();
        let supply: Vec<f64> = (0..4).map(|_| 1. + weights.sample(&mut rng) as f64).collect();
        let arcs: Vec<Vec<Edge<u32>>> = (0..5)
            .map(|i| {
                (0..4)
                    .map(|j| Edge::new(costs.sample(&mut rng) as f64, i, j))
                    .collect()
            })
            .collect();
        if demand.iter().sum::<f64>() > supply.iter().sum::<f64>() {
            return;
        }

        let params = AuctionParams::for_problem(&arcs, supply.len());
        let mut solver =
            UnitAuction::<u32, TIE_AWARE>::new(&demand, &supply, &arcs, params).unwrap();
        let mut eps = params.max_eps;
        loop {
            eps *= params.scale;
            solver.refresh(eps);
            while solver.any_active() {
                let prices = solver.ledger.prices();
                let bids: Vec<Bid<u32>> = solver
                    .bidders
                    .iter()
                    .filter_map(|b| {
                        if TIE_AWARE {
                            b.make_tie_aware_bid(prices)
                        } else {
                            b.make_bid(prices)
                        }
                    })
                    .collect();
                for bid in bids.iter() {
                    let before: Vec<f64> = solver.ledger.prices().iter().map(|p| p.value).collect();
                    solver
                        .ledger
                        .apply(std::slice::from_ref(bid), &mut solver.bidders);
                    for (price, old) in solver.ledger.prices().iter().zip(before.iter()) {
                        assert!(price.value >= *old, "seed {}: price dropped", seed);
                    }
                    // every unit bidder holds at most one unit lot
                    let mut held = vec![0; solver.bidders.len()];
                    for price in solver.ledger.prices().iter() {
                        if let Some(owner) = price.owner() {
                            held[owner as usize] += 1;
                        }
                    }
                    assert!(held.iter().all(|n| *n <= 1));
                    for (bidder, n) in solver.bidders.iter().zip(held.iter()) {
                        assert_eq!(bidder.is_active(), *n == 0);
                    }
                }
            }
            if eps < params.min_eps {
                break;
            }
        }
        let solution = solver.assemble(eps, 0, 0);
        assert_eq!(solution.shipped(demand.len()), demand);
    }

    #[test]
    fn test_unit_prices_rise_within_level() {
        crate::init();
        for seed in 0..20 {
            check_rounds::<false>(seed);
            check_rounds::<true>(seed);
        }
    }

    #[test]
    fn test_fractional_weights_give_empty_solver() {
        let mut solver = AssignmentAuction::new(
            &[1.5, 1.5],
            &[3., 0.],
            &swapped(),
            AuctionParams::default(),
        )
        .unwrap();
        assert!(solver.is_empty());
        let solution = solver.solve();
        assert!(solution.is_empty());
        assert!(solution.prices.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let arcs: Vec<Vec<Edge<u32>>> = vec![vec![]];
        let mut solver =
            SimilarObjectAuction::new(&[0.], &[], &arcs, AuctionParams::default()).unwrap();
        assert!(solver.is_empty());
        assert!(solver.solve().is_empty());
    }

    #[test]
    fn test_unreachable_units_are_rejected() {
        let arcs = vec![vec![Edge::new(1., 0u32, 1)]];
        let params = AuctionParams::default();
        assert!(AssignmentAuction::new(&[2.], &[2., 0.], &arcs, params).is_err());
        assert!(AssignmentAuction::new(&[4.], &[2., 1.], &swapped()[..1], params).is_err());
    }
}
