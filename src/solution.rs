use num_traits::{AsPrimitive, FromPrimitive, NumAssign, PrimInt, Unsigned};
use std::fmt::{Debug, Display};

pub trait UnsignedInt:
    PrimInt
    + Unsigned
    + Display
    + Debug
    + AsPrimitive<usize>
    + AsPrimitive<f64>
    + FromPrimitive
    + NumAssign
{
    /// Marks a missing bidder or lot in index-coded storage.
    ///
    /// Solvers ensure that every valid index is strictly below it.
    #[inline]
    fn none() -> Self {
        Self::max_value()
    }

    #[inline]
    fn to_option(self) -> Option<Self> {
        if self == Self::none() {
            None
        } else {
            Some(self)
        }
    }
}

impl<T> UnsignedInt for T where
    T: PrimInt
        + Unsigned
        + Display
        + Debug
        + AsPrimitive<usize>
        + AsPrimitive<f64>
        + FromPrimitive
        + NumAssign
{
}

/// Input arc from a demand node (`source`) to a supply node (`sink`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge<I: UnsignedInt> {
    pub cost: f64,
    pub source: I,
    pub sink: I,
}

impl<I: UnsignedInt> Edge<I> {
    pub fn new(cost: f64, source: I, sink: I) -> Self {
        Edge { cost, source, sink }
    }
}

/// Regroups arcs by their sink, swapping the roles of sources and sinks.
pub fn transpose_arcs<I: UnsignedInt>(
    arcs: &[Vec<Edge<I>>],
    num_sinks: usize,
) -> Vec<Vec<Edge<I>>> {
    let mut out: Vec<Vec<Edge<I>>> = vec![Vec::new(); num_sinks];
    for edge in arcs.iter().flatten() {
        let sink: usize = edge.sink.as_();
        out[sink].push(Edge::new(edge.cost, edge.sink, edge.source));
    }
    out
}

/// Transport plan entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flow<I: UnsignedInt> {
    pub amount: f64,
    /// demand node shipping to `sink`, `None` marks a lot that received nothing
    pub source: Option<I>,
    pub sink: I,
}

/// Side of the bipartite graph the price vector is indexed by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Demand,
    Supply,
}

///
/// Solution of the transportation problem
///
#[derive(Debug, Clone)]
pub struct AuctionSolution<I>
where
    I: UnsignedInt,
{
    /// flows sorted by sink, then by source
    pub plan: Vec<Flow<I>>,
    /// final price of every node on the `priced` side
    pub prices: Vec<f64>,
    pub priced: Side,
    /// ε of the last scaling level, NaN if nothing was solved
    pub eps: f64,
    /// number of bidding rounds over all levels
    pub nits: u32,
    /// number of ε levels
    pub nreductions: u32,
}

impl<I> AuctionSolution<I>
where
    I: UnsignedInt,
{
    /// Solution of a degenerate instance without bidders or lots
    pub fn empty(priced: Side) -> AuctionSolution<I> {
        AuctionSolution::<I> {
            plan: Vec::new(),
            prices: Vec::new(),
            priced,
            eps: f64::NAN,
            nits: 0,
            nreductions: 0,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.plan.is_empty()
    }

    /// Total flow leaving every demand node
    pub fn shipped(&self, num_demand: usize) -> Vec<f64> {
        let mut out = vec![0.; num_demand];
        for flow in self.plan.iter() {
            if let Some(source) = flow.source {
                let source: usize = source.as_();
                out[source] += flow.amount;
            }
        }
        out
    }

    /// Total flow entering every supply node
    pub fn received(&self, num_supply: usize) -> Vec<f64> {
        let mut out = vec![0.; num_supply];
        for flow in self.plan.iter() {
            let sink: usize = flow.sink.as_();
            out[sink] += flow.amount;
        }
        out
    }
}
