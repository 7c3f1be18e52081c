use crate::solution::{transpose_arcs, AuctionSolution, Edge, Flow, Side, UnsignedInt};
use tracing::{trace, warn};

/// Primal and dual objective of a solved instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostReport {
    pub primal: f64,
    pub dual: f64,
    /// plan entries without a matching arc
    pub inconsistent: usize,
}

impl CostReport {
    /// Duality gap, never negative for a feasible plan and consistent prices.
    #[inline]
    pub fn gap(&self) -> f64 {
        self.dual - self.primal
    }
}

/// Total cost of the plan, together with the number of entries that have no arc.
pub fn primal_cost<I: UnsignedInt>(arcs: &[Vec<Edge<I>>], plan: &[Flow<I>]) -> (f64, usize) {
    let mut cost = 0.;
    let mut inconsistent = 0;
    for flow in plan.iter() {
        let source = match flow.source {
            Some(source) => source,
            None => continue,
        };
        let row: usize = source.as_();
        let edge = arcs
            .get(row)
            .and_then(|row_arcs| row_arcs.iter().find(|edge| edge.sink == flow.sink));
        match edge {
            Some(edge) => {
                trace!("{} -> {}: {} @ {}", source, flow.sink, flow.amount, edge.cost);
                cost += edge.cost * flow.amount;
            }
            None => {
                warn!("plan ships {} over missing arc {} -> {}", flow.amount, source, flow.sink);
                inconsistent += 1;
            }
        }
    }
    (cost, inconsistent)
}

/// Σ weight · best profit of every node on one side, plus Σ weight · price on the other.
fn profits_and_prices<I: UnsignedInt>(
    weights: &[f64],
    arcs: &[Vec<Edge<I>>],
    priced_weights: &[f64],
    prices: &[f64],
) -> f64 {
    let mut dual = 0.;
    for (weight, row_arcs) in weights.iter().zip(arcs.iter()) {
        if *weight == 0. || row_arcs.is_empty() {
            continue;
        }
        let best = row_arcs
            .iter()
            .map(|edge| {
                let sink: usize = edge.sink.as_();
                edge.cost - prices[sink]
            })
            .fold(f64::NEG_INFINITY, f64::max);
        dual += weight * best;
    }
    dual + priced_weights
        .iter()
        .zip(prices.iter())
        .filter(|(weight, _)| **weight != 0.)
        .map(|(weight, price)| weight * price)
        .sum::<f64>()
}

/// Dual objective of the prices, the best profit of every unpriced node is derived from them.
pub fn dual_cost<I: UnsignedInt>(
    demand: &[f64],
    supply: &[f64],
    arcs: &[Vec<Edge<I>>],
    prices: &[f64],
    priced: Side,
) -> f64 {
    match priced {
        Side::Supply => profits_and_prices(demand, arcs, supply, prices),
        Side::Demand => {
            let transposed = transpose_arcs(arcs, supply.len());
            profits_and_prices(supply, &transposed, demand, prices)
        }
    }
}

pub fn evaluate<I: UnsignedInt>(
    demand: &[f64],
    supply: &[f64],
    arcs: &[Vec<Edge<I>>],
    solution: &AuctionSolution<I>,
) -> CostReport {
    let (primal, inconsistent) = primal_cost(arcs, &solution.plan);
    CostReport {
        primal,
        dual: dual_cost(demand, supply, arcs, &solution.prices, solution.priced),
        inconsistent,
    }
}

#[cfg(test)]
mod tests {
    use super::{dual_cost, evaluate, primal_cost};
    use crate::solution::{AuctionSolution, Edge, Flow, Side};

    fn arcs() -> Vec<Vec<Edge<u32>>> {
        vec![
            vec![Edge::new(1., 0, 0), Edge::new(10., 0, 1)],
            vec![Edge::new(10., 1, 0)],
        ]
    }

    fn plan() -> Vec<Flow<u32>> {
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
    fn test_primal_cost() {
        assert_eq!(primal_cost(&arcs(), &plan()), (90., 0));

        let mut plan = plan();
        plan.push(Flow {
            amount: 0.,
            source: None,
            sink: 1,
        });
        plan.push(Flow {
            amount: 2.,
            source: Some(1),
            sink: 1,
        });
        assert_eq!(primal_cost(&arcs(), &plan), (90., 1));
    }

    #[test]
    fn test_dual_cost_by_side() {
        let demand = [6., 3.];
        let supply = [3., 6.];
        // demand 0: max(1 - 0, 10 - 4) = 6, demand 1: 10 - 0 = 10
        let supply_priced = dual_cost(&demand, &supply, &arcs(), &[0., 4.], Side::Supply);
        assert_eq!(supply_priced, 6. * 6. + 3. * 10. + 6. * 4.);

        // supply 0: max(1 - 2, 10 - 1) = 9, supply 1: 10 - 2 = 8
        let demand_priced = dual_cost(&demand, &supply, &arcs(), &[2., 1.], Side::Demand);
        assert_eq!(demand_priced, 3. * 9. + 6. * 8. + 6. * 2. + 3. * 1.);
    }

    #[test]
    fn test_zero_weights_ignore_infinite_prices() {
        let dual = dual_cost(&[1., 0.], &[1., 0.], &arcs(), &[0., f64::INFINITY], Side::Supply);
        assert_eq!(dual, 1.);
    }

    #[test]
    fn test_evaluate() {
        let mut solution = AuctionSolution::<u32>::empty(Side::Supply);
        solution.plan = plan();
        solution.prices = vec![0., 0.];
        let report = evaluate(&[6., 3.], &[3., 6.], &arcs(), &solution);
        assert_eq!(report.primal, 90.);
        assert_eq!(report.dual, 90.);
        assert_eq!(report.inconsistent, 0);
        assert_eq!(report.gap(), 0.);
    }
}
