use crate::bidder::{Bid, Bidder};
use crate::solution::{Flow, UnsignedInt};
use tracing::trace;

/// Current best price of a lot and the bidder holding it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Price<I: UnsignedInt> {
    pub value: f64,
    pub(crate) owner: I,
    pub lot: I,
}

impl<I: UnsignedInt> Price<I> {
    pub fn new(lot: I) -> Self {
        Price {
            value: 0.,
            owner: I::none(),
            lot,
        }
    }

    #[inline]
    pub fn owner(&self) -> Option<I> {
        self.owner.to_option()
    }
}

/// Prices of unit lots, resolving the bids of unit and multi-unit bidders
#[derive(Debug, Clone)]
pub struct PriceLedger<I: UnsignedInt> {
    prices: Vec<Price<I>>,
    changed: Vec<bool>,
    changed_lots: Vec<usize>,
}

impl<I: UnsignedInt> PriceLedger<I> {
    /// `lots` are the ids of the priced lots, in ledger order.
    pub fn new(lots: impl IntoIterator<Item = I>) -> Self {
        let prices: Vec<Price<I>> = lots.into_iter().map(Price::new).collect();
        let num_lots = prices.len();
        PriceLedger {
            prices,
            changed: vec![false; num_lots],
            changed_lots: Vec::with_capacity(num_lots),
        }
    }

    #[inline]
    pub fn prices(&self) -> &[Price<I>] {
        &self.prices
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Forgets every owner, prices stay.
    pub fn release_all(&mut self) {
        self.prices
            .iter_mut()
            .for_each(|price| price.owner = I::none());
    }

    /// Applies `bids` in order, returns the number of lots that changed hands.
    ///
    /// A bid wins when it beats the current price, or matches it on a lot without owner, so a lot
    /// carried over at an infinite price can be won again. Prices never drop. Later bids see
    /// the prices raised by earlier ones. The owner a lot had before the round is released once
    /// and the final winner is credited once.
    pub fn apply<B>(&mut self, bids: &[Bid<I>], bidders: &mut [B]) -> usize
    where
        B: Bidder<Weight = u64>,
    {
        for bid in bids.iter() {
            let lot: usize = bid.unit.as_();
            let price = &mut self.prices[lot];
            if bid.value > price.value || (price.owner == I::none() && bid.value >= price.value) {
                if !self.changed[lot] {
                    self.changed[lot] = true;
                    self.changed_lots.push(lot);
                    if let Some(owner) = price.owner() {
                        let owner: usize = owner.as_();
                        bidders[owner].pop(1);
                    }
                }
                price.value = bid.value;
                price.owner = bid.bidder;
            }
        }

        let num_changed = self.changed_lots.len();
        for lot in self.changed_lots.drain(..) {
            self.changed[lot] = false;
            let owner: usize = self.prices[lot].owner.as_();
            bidders[owner].push(1);
        }
        trace!("{} lots changed hands", num_changed);
        num_changed
    }

    /// Merges the unit lots back into the transport plan.
    ///
    /// `lot_of` maps a ledger entry to the lot it was cut from, `holder_of` maps its owner to the
    /// reported source. Every held unit adds `unit` to the flow of its (lot, holder) pair. A lot
    /// without any held unit gets a zero flow entry with no source.
    pub fn assemble(
        &self,
        lot_of: &[I],
        holder_of: impl Fn(I) -> I,
        unit: f64,
    ) -> Vec<Flow<I>> {
        let mut held: Vec<(I, I)> = self
            .prices
            .iter()
            .map(|price| {
                let entry: usize = price.lot.as_();
                let holder = price.owner().map_or(I::none(), &holder_of);
                (lot_of[entry], holder)
            })
            .collect();
        held.sort_unstable();

        let mut plan: Vec<Flow<I>> = Vec::with_capacity(held.len());
        for (lot, holder) in held {
            match plan.last_mut() {
                Some(last) if last.sink == lot => {
                    if last.source == holder.to_option() && holder != I::none() {
                        last.amount += unit;
                    } else if holder != I::none() {
                        plan.push(Flow {
                            amount: unit,
                            source: Some(holder),
                            sink: lot,
                        });
                    }
                }
                _ => plan.push(match holder.to_option() {
                    Some(source) => Flow {
                        amount: unit,
                        source: Some(source),
                        sink: lot,
                    },
                    None => Flow {
                        amount: 0.,
                        source: None,
                        sink: lot,
                    },
                }),
            }
        }
        plan
    }

    /// Smallest price over the units of every lot, zero for lots without units.
    pub fn lot_prices(&self, lot_of: &[I], num_lots: usize) -> Vec<f64> {
        let mut lowest: Vec<Option<f64>> = vec![None; num_lots];
        for price in self.prices.iter() {
            let entry: usize = price.lot.as_();
            let lot: usize = lot_of[entry].as_();
            lowest[lot] = Some(lowest[lot].map_or(price.value, |p| p.min(price.value)));
        }
        lowest.into_iter().map(|p| p.unwrap_or(0.)).collect()
    }
}
