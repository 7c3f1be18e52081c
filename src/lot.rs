use crate::bidder::{Bidder, FractionalBidder};
use crate::ledger::Price;
use crate::numeric::Tolerance;
use crate::solution::UnsignedInt;
use std::collections::VecDeque;
use tracing::trace;

/// Partial award of a lot's weight to a bidder
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Claim<I: UnsignedInt> {
    pub bidder: I,
    pub lot: I,
    pub price: f64,
    pub weight: f64,
}

impl<I: UnsignedInt> Claim<I> {
    /// A claim ranks below another one when it pays less, or pays the same for less weight.
    #[inline]
    fn ranks_below(&self, other: &Claim<I>, tolerance: Tolerance) -> bool {
        let tol = tolerance.value();
        (other.price - self.price > tol)
            || (tolerance.equal(self.price, other.price) && (other.weight - self.weight > tol))
    }
}

/// Claims held by a lot, weakest first
#[derive(Debug, Clone)]
pub struct ClaimBook<I: UnsignedInt> {
    claims: VecDeque<Claim<I>>,
    tolerance: Tolerance,
}

impl<I: UnsignedInt> ClaimBook<I> {
    pub fn new(tolerance: Tolerance) -> Self {
        ClaimBook {
            claims: VecDeque::new(),
            tolerance,
        }
    }

    /// Inserts in front of all equally ranked claims.
    pub fn insert(&mut self, claim: Claim<I>) {
        let tolerance = self.tolerance;
        let pos = self
            .claims
            .partition_point(|c| c.ranks_below(&claim, tolerance));
        self.claims.insert(pos, claim);
    }

    #[inline]
    pub fn weakest(&self) -> Option<&Claim<I>> {
        self.claims.front()
    }

    #[inline]
    pub fn pop_weakest(&mut self) -> Option<Claim<I>> {
        self.claims.pop_front()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Claim<I>> {
        self.claims.iter()
    }

    #[cfg(test)]
    pub(crate) fn total_weight(&self) -> f64 {
        self.claims.iter().map(|c| c.weight).sum()
    }

    pub fn clear(&mut self) {
        self.claims.clear()
    }
}

/// Supply node of the general auction
#[derive(Debug, Clone)]
pub struct Lot<I: UnsignedInt> {
    id: I,
    capacity: f64,
    free: f64,
    claims: ClaimBook<I>,
    tolerance: Tolerance,
}

impl<I: UnsignedInt> Lot<I> {
    pub fn new(id: I, capacity: f64, tolerance: Tolerance) -> Self {
        Lot {
            id,
            capacity,
            free: capacity,
            claims: ClaimBook::new(tolerance),
            tolerance,
        }
    }

    /// Lot still has free weight
    #[inline]
    pub(crate) fn is_active(&self) -> bool {
        self.free > self.tolerance.value()
    }

    #[inline]
    pub(crate) fn free(&self) -> f64 {
        self.free
    }

    #[inline]
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    #[inline]
    pub fn claims(&self) -> &ClaimBook<I> {
        &self.claims
    }

    pub fn refresh(&mut self) {
        self.claims.clear();
        self.free = self.capacity;
    }

    /// Admits as much of `claim` as its price allows.
    ///
    /// Missing weight is freed by evicting claims from the weakest one up, for as long as
    /// `claim` outbids the lot's price. A claim of the same bidder is merged into `claim`
    /// instead of competing with it. The last evicted claim may be cut down to the missing
    /// weight. `price` is raised to the weakest admitted claim once the lot is full.
    ///
    /// Returns false if nothing of `claim` was admitted; the lot and the bidders are unchanged
    /// in that case.
    pub fn update_claim(
        &mut self,
        mut claim: Claim<I>,
        price: &mut Price<I>,
        bidders: &mut [FractionalBidder<I>],
    ) -> bool {
        let tol = self.tolerance.value();
        if self.capacity < claim.weight {
            claim.weight = self.capacity;
        }
        let mut deficit = claim.weight - self.free;
        while deficit > tol && claim.price > price.value {
            let weakest = match self.claims.pop_weakest() {
                Some(weakest) => weakest,
                None => break,
            };
            if weakest.bidder == claim.bidder {
                claim.weight += weakest.weight;
                if self.capacity < claim.weight {
                    claim.weight = self.capacity;
                }
                deficit = claim.weight - self.free;
            }
            let weakest_bidder: usize = weakest.bidder.as_();
            if weakest.weight - deficit > tol {
                self.free = claim.weight;
                bidders[weakest_bidder].pop(deficit);
                trace!(
                    "lot {}: bidder {} gives up {} to bidder {}",
                    self.id,
                    weakest.bidder,
                    deficit,
                    claim.bidder
                );
                self.claims.insert(Claim {
                    weight: weakest.weight - deficit,
                    ..weakest
                });
                deficit = 0.;
            } else {
                self.free += weakest.weight;
                bidders[weakest_bidder].pop(weakest.weight);
                trace!(
                    "lot {}: bidder {} evicted by bidder {}",
                    self.id,
                    weakest.bidder,
                    claim.bidder
                );
                deficit -= weakest.weight;
                if let Some(next) = self.claims.weakest() {
                    price.value = next.price;
                }
            }
        }
        if self.free < claim.weight {
            claim.weight = self.free;
        }
        if claim.weight <= 0. {
            return false;
        }

        price.owner = claim.bidder;
        self.free -= claim.weight;
        let bidder: usize = claim.bidder.as_();
        bidders[bidder].push(claim.weight);
        self.claims.insert(claim);
        if self.free < tol {
            if let Some(weakest) = self.claims.weakest() {
                price.value = weakest.price;
            }
        }
        true
    }
}
