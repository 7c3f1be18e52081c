use crate::ledger::Price;
use crate::lot::Claim;
use crate::numeric::Tolerance;
use crate::solution::{Edge, UnsignedInt};
use std::cmp::Ordering;
use std::sync::Arc;

/// State every bidder kind shares with the auctioneer.
///
/// Claimed weight is reset by `refresh` at the start of every ε level and is changed only by
/// the claim resolution step through `push` and `pop`.
pub trait Bidder {
    type Weight: Copy;

    fn is_active(&self) -> bool;
    fn refresh(&mut self, eps: f64);
    fn push(&mut self, amount: Self::Weight);
    fn pop(&mut self, amount: Self::Weight);
}

/// Bid of a unit bidder for one unit lot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bid<I: UnsignedInt> {
    pub value: f64,
    pub bidder: I,
    pub unit: I,
}

/// Arc to one unit of a decomposed lot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitEdge<I: UnsignedInt> {
    pub cost: f64,
    /// original lot the unit was cut from
    pub class: I,
    /// index of the unit lot
    pub unit: I,
}

/// Outcome of the choice rule: the most profitable arc and the runner-up profit
#[derive(Debug, Clone, Copy)]
struct Choice {
    idx: usize,
    edge_value: f64,
    second_max_profit: f64,
}

/// Scans all arcs once, keeping the best and the second best net value.
#[inline]
fn choose<A>(arcs: &[A], mut value_and_price: impl FnMut(&A) -> (f64, f64)) -> Option<Choice> {
    if arcs.is_empty() {
        return None;
    }
    // an arc whose lot is priced at infinity is never preferred, fall back to the first one
    let mut choice = Choice {
        idx: 0,
        edge_value: value_and_price(&arcs[0]).0,
        second_max_profit: f64::NEG_INFINITY,
    };
    let mut max_profit = f64::NEG_INFINITY;
    for (idx, arc) in arcs.iter().enumerate() {
        let (edge_value, price) = value_and_price(arc);
        let profit = edge_value - price;
        if profit > max_profit {
            choice.second_max_profit = max_profit;
            max_profit = profit;
            choice.idx = idx;
            choice.edge_value = edge_value;
        } else if profit > choice.second_max_profit {
            choice.second_max_profit = profit;
        }
    }
    Some(choice)
}

/// Price that leaves the bidder indifferent between the chosen lot and the runner-up, raised by ε.
/// Without a runner-up the bid is infinite so the current holder is always displaced.
#[inline]
fn bid_value(edge_value: f64, second_max_profit: f64, eps: f64) -> f64 {
    if second_max_profit.is_finite() {
        edge_value - second_max_profit + eps
    } else {
        f64::INFINITY
    }
}

/// Bidder of the general auction: claims any fraction of its weight on a single lot per round
#[derive(Debug, Clone)]
pub struct FractionalBidder<I: UnsignedInt> {
    id: I,
    capacity: f64,
    claimed: f64,
    eps: f64,
    tolerance: Tolerance,
    arcs: Vec<Edge<I>>,
}

impl<I: UnsignedInt> FractionalBidder<I> {
    pub fn new(id: I, capacity: f64, arcs: Vec<Edge<I>>, tolerance: Tolerance) -> Self {
        FractionalBidder {
            id,
            capacity,
            claimed: 0.,
            eps: 1.,
            tolerance,
            arcs,
        }
    }

    #[cfg(test)]
    pub(crate) fn claimed(&self) -> f64 {
        self.claimed
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Claims all the missing weight on the most profitable lot.
    pub fn make_claim(&self, prices: &[Price<I>]) -> Option<Claim<I>> {
        if !self.is_active() {
            return None;
        }
        let choice = choose(&self.arcs, |edge| {
            let sink: usize = edge.sink.as_();
            (edge.cost, prices[sink].value)
        })?;
        Some(Claim {
            bidder: self.id,
            lot: self.arcs[choice.idx].sink,
            price: bid_value(choice.edge_value, choice.second_max_profit, self.eps),
            weight: self.capacity - self.claimed,
        })
    }
}

impl<I: UnsignedInt> Bidder for FractionalBidder<I> {
    type Weight = f64;

    #[inline]
    fn is_active(&self) -> bool {
        !self.tolerance.equal(self.capacity, self.claimed)
    }

    #[inline]
    fn refresh(&mut self, eps: f64) {
        self.eps = eps;
        self.claimed = 0.;
    }

    #[inline]
    fn push(&mut self, amount: f64) {
        self.claimed += amount;
    }

    #[inline]
    fn pop(&mut self, amount: f64) {
        self.claimed -= amount;
    }
}

/// Single unit of a decomposed demand node
///
/// Units of the same demand node share their arcs and the similarity class.
#[derive(Debug, Clone)]
pub struct UnitBidder<I: UnsignedInt> {
    id: I,
    class: I,
    capacity: u64,
    claimed: u64,
    eps: f64,
    arcs: Arc<[UnitEdge<I>]>,
}

impl<I: UnsignedInt> UnitBidder<I> {
    pub fn new(id: I, class: I, arcs: Arc<[UnitEdge<I>]>) -> Self {
        UnitBidder {
            id,
            class,
            capacity: 1,
            claimed: 0,
            eps: 1.,
            arcs,
        }
    }

    /// Demand node the unit was cut from
    #[inline]
    pub fn class(&self) -> I {
        self.class
    }

    /// Bids on the best unit lot against the best alternative unit.
    pub fn make_bid(&self, prices: &[Price<I>]) -> Option<Bid<I>> {
        if !self.is_active() {
            return None;
        }
        let choice = choose(&self.arcs, |edge| {
            let unit: usize = edge.unit.as_();
            (edge.cost, prices[unit].value)
        })?;
        Some(Bid {
            value: bid_value(choice.edge_value, choice.second_max_profit, self.eps),
            bidder: self.id,
            unit: self.arcs[choice.idx].unit,
        })
    }

    /// Like `make_bid`, but units cut from the same lot as the best one are not treated as
    /// alternatives. Without any unit of another lot the plain runner-up is used.
    pub fn make_tie_aware_bid(&self, prices: &[Price<I>]) -> Option<Bid<I>> {
        if !self.is_active() {
            return None;
        }
        let profit = |edge: &UnitEdge<I>| {
            let unit: usize = edge.unit.as_();
            edge.cost - prices[unit].value
        };
        let choice = choose(&self.arcs, |edge| {
            let unit: usize = edge.unit.as_();
            (edge.cost, prices[unit].value)
        })?;
        let best = self.arcs[choice.idx];

        let second_max_profit = if self.arcs.len() > 1 {
            self.arcs
                .iter()
                .filter(|edge| edge.class != best.class)
                .map(profit)
                .fold(None, |acc: Option<f64>, p| match acc {
                    Some(max) if max >= p => Some(max),
                    _ => Some(p),
                })
                .unwrap_or(choice.second_max_profit)
        } else {
            choice.second_max_profit
        };

        Some(Bid {
            value: bid_value(choice.edge_value, second_max_profit, self.eps),
            bidder: self.id,
            unit: best.unit,
        })
    }
}

impl<I: UnsignedInt> Bidder for UnitBidder<I> {
    type Weight = u64;

    #[inline]
    fn is_active(&self) -> bool {
        self.capacity > self.claimed
    }

    #[inline]
    fn refresh(&mut self, eps: f64) {
        self.eps = eps;
        self.claimed = 0;
    }

    #[inline]
    fn push(&mut self, amount: u64) {
        self.claimed += amount;
    }

    #[inline]
    fn pop(&mut self, amount: u64) {
        self.claimed -= amount;
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate<I: UnsignedInt> {
    profit: f64,
    edge: UnitEdge<I>,
}

#[inline]
fn by_profit_desc<I: UnsignedInt>(a: &Candidate<I>, b: &Candidate<I>) -> Ordering {
    b.profit.total_cmp(&a.profit)
}

/// Bidder that needs several units at once and bids for all of them in one round
#[derive(Debug, Clone)]
pub struct MultiUnitBidder<I: UnsignedInt> {
    id: I,
    capacity: u64,
    claimed: u64,
    eps: f64,
    arcs: Vec<UnitEdge<I>>,
}

impl<I: UnsignedInt> MultiUnitBidder<I> {
    pub fn new(id: I, capacity: u64, arcs: Vec<UnitEdge<I>>) -> Self {
        MultiUnitBidder {
            id,
            capacity,
            claimed: 0,
            eps: 1.,
            arcs,
        }
    }

    /// Appends this round's bids to `bids`: first re-bids for every unit already held, then
    /// bids for the best missing units.
    ///
    /// All bids are priced against the same threshold, the best profit among units that are
    /// neither held nor bid for. Held units are left out of the threshold, so the bidder never
    /// competes with itself. When held units, chosen units and the threshold unit are all cut
    /// from one lot, the threshold moves on to the first unit of another lot.
    pub fn make_bids(&self, prices: &[Price<I>], bids: &mut Vec<Bid<I>>) {
        let need = self.capacity.saturating_sub(self.claimed) as usize;
        if need == 0 {
            return;
        }

        let mut owned = Vec::with_capacity(self.arcs.len());
        let mut others = Vec::with_capacity(self.arcs.len());
        // class shared by all held units, none while nothing is held
        let mut class = I::none();
        let mut same_class = true;
        for edge in self.arcs.iter() {
            let unit: usize = edge.unit.as_();
            let price = &prices[unit];
            if price.owner == self.id {
                owned.push(*edge);
                if same_class {
                    if class == I::none() {
                        class = edge.class;
                    } else if class != edge.class {
                        same_class = false;
                    }
                }
            } else {
                others.push(Candidate {
                    profit: edge.cost - price.value,
                    edge: *edge,
                });
            }
        }

        let (threshold, num_chosen) = if need >= others.len() {
            others.sort_by(by_profit_desc);
            (f64::NEG_INFINITY, others.len())
        } else {
            others.select_nth_unstable_by(need, by_profit_desc);
            let mut threshold = others[need].profit;
            if same_class && need + 1 < others.len() {
                if class == I::none() {
                    class = others[0].edge.class;
                }
                if others[need].edge.class == class
                    && others[..need].iter().all(|c| c.edge.class == class)
                {
                    others.sort_by(by_profit_desc);
                    threshold = others[need + 1..]
                        .iter()
                        .find(|c| c.edge.class != class)
                        .map_or(others[need].profit, |c| c.profit);
                }
            }
            (threshold, need)
        };

        let value = |cost: f64| bid_value(cost, threshold, self.eps);
        bids.extend(owned.iter().map(|edge| Bid {
            value: value(edge.cost),
            bidder: self.id,
            unit: edge.unit,
        }));
        bids.extend(others[..num_chosen].iter().map(|c| Bid {
            value: value(c.edge.cost),
            bidder: self.id,
            unit: c.edge.unit,
        }));
    }
}

impl<I: UnsignedInt> Bidder for MultiUnitBidder<I> {
    type Weight = u64;

    #[inline]
    fn is_active(&self) -> bool {
        self.capacity > self.claimed
    }

    #[inline]
    fn refresh(&mut self, eps: f64) {
        self.eps = eps;
        self.claimed = 0;
    }

    #[inline]
    fn push(&mut self, amount: u64) {
        self.claimed += amount;
    }

    #[inline]
    fn pop(&mut self, amount: u64) {
        self.claimed -= amount;
    }
}
