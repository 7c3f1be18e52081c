use crate::bidder::UnitEdge;
use crate::numeric::Tolerance;
use crate::solution::{Edge, UnsignedInt};
use crate::solver::index;
use anyhow;
use anyhow::Result;
use num_integer::Integer;
use num_iter;
use tracing::{trace, warn};

/// Integer decomposition of a weighted problem into unit bidders and unit lots.
///
/// All weights are divided by their greatest common divisor, a node of weight `w` becomes
/// `w / gcd` units. Units of lot `j` occupy the contiguous range
/// `lot_offsets[j]..lot_offsets[j + 1]` and `unit_lots` maps every unit back to `j`.
#[derive(Debug, Clone)]
pub struct UnitGrid<I: UnsignedInt> {
    gcd: u64,
    bidder_units: Vec<u64>,
    lot_units: Vec<u64>,
    lot_offsets: Vec<usize>,
    unit_lots: Vec<I>,
}

impl<I: UnsignedInt> UnitGrid<I> {
    /// Returns `None` if some weight is not integral, weights are never rounded.
    pub fn new(
        bidders: &[f64],
        lots: &[f64],
        tolerance: Tolerance,
    ) -> Result<Option<Self>, anyhow::Error> {
        if let Some(weight) = bidders
            .iter()
            .chain(lots.iter())
            .find(|w| !tolerance.is_integral(**w))
        {
            warn!("unit auctions require integer weights, got {}", weight);
            return Ok(None);
        }
        let bidder_weights: Vec<u64> = bidders.iter().map(|w| w.round() as u64).collect();
        let lot_weights: Vec<u64> = lots.iter().map(|w| w.round() as u64).collect();
        let gcd = bidder_weights
            .iter()
            .chain(lot_weights.iter())
            .fold(0u64, |acc, w| acc.gcd(w))
            .max(1);
        trace!("gcd of weights: {}", gcd);

        let bidder_units: Vec<u64> = bidder_weights.iter().map(|w| w / gcd).collect();
        let lot_units: Vec<u64> = lot_weights.iter().map(|w| w / gcd).collect();
        let mut lot_offsets = Vec::with_capacity(lot_units.len() + 1);
        lot_offsets.push(0usize);
        for units in lot_units.iter() {
            let last = lot_offsets[lot_offsets.len() - 1];
            lot_offsets.push(last + *units as usize);
        }
        let num_units = lot_offsets[lot_offsets.len() - 1];
        // unit ids must stay below the sentinel
        index::<I>(num_units)?;
        index::<I>(bidder_units.iter().sum::<u64>() as usize)?;

        let mut unit_lots = Vec::with_capacity(num_units);
        for (lot, units) in num_iter::range(I::zero(), index::<I>(lot_units.len())?)
            .zip(lot_units.iter())
        {
            unit_lots.extend(std::iter::repeat(lot).take(*units as usize));
        }

        Ok(Some(UnitGrid {
            gcd,
            bidder_units,
            lot_units,
            lot_offsets,
            unit_lots,
        }))
    }

    /// Weight carried by every unit
    #[inline]
    pub fn unit(&self) -> f64 {
        self.gcd as f64
    }

    #[inline]
    pub fn bidder_units(&self) -> &[u64] {
        &self.bidder_units
    }

    #[inline]
    pub fn lot_units(&self) -> &[u64] {
        &self.lot_units
    }

    #[inline]
    pub fn num_units(&self) -> usize {
        self.unit_lots.len()
    }

    /// Original lot of every unit lot
    #[inline]
    pub fn unit_lots(&self) -> &[I] {
        &self.unit_lots
    }

    /// Replaces every arc to a lot with one arc per unit of that lot.
    pub fn unit_arcs(&self, arcs: &[Edge<I>]) -> Result<Vec<UnitEdge<I>>, anyhow::Error> {
        let mut out = Vec::with_capacity(arcs.len());
        for edge in arcs.iter() {
            let lot: usize = edge.sink.as_();
            for unit in self.lot_offsets[lot]..self.lot_offsets[lot + 1] {
                out.push(UnitEdge {
                    cost: edge.cost,
                    class: edge.sink,
                    unit: index(unit)?,
                });
            }
        }
        Ok(out)
    }
}
