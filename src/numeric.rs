use crate::solution::{Edge, UnsignedInt};
use anyhow;
use anyhow::{ensure, Result};

/// Floating point comparison policy shared by bidders and lots.
///
/// Two values are equal when their difference is below the tolerance, scaled by the larger
/// magnitude for values above one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance(f64);

impl Tolerance {
    pub fn new(tolerance: f64) -> Self {
        Tolerance(tolerance)
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.0
    }

    #[inline]
    pub fn equal(&self, x: f64, y: f64) -> bool {
        (x - y).abs() < self.0.max(self.0 * x.abs().max(y.abs()))
    }

    #[inline]
    pub fn is_integral(&self, x: f64) -> bool {
        self.equal(x, x.round())
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance(f64::EPSILON.sqrt())
    }
}

///
/// Epsilon schedule and numerical policy of an auction
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuctionParams {
    /// ε before the first reduction
    pub max_eps: f64,
    /// scaling stops after the first level with ε below this value
    pub min_eps: f64,
    /// factor applied to ε before every level, in (0, 1)
    pub scale: f64,
    /// tolerance of floating point equality
    pub tolerance: Tolerance,
}

impl Default for AuctionParams {
    fn default() -> Self {
        AuctionParams {
            max_eps: 1.0,
            min_eps: 1.0,
            scale: 0.25,
            tolerance: Tolerance::default(),
        }
    }
}

impl AuctionParams {
    /// Picks ε bounds from the arc costs: starts from a fifth of the largest absolute cost and
    /// stops once ε drops below one over the number of supply nodes.
    pub fn for_problem<I: UnsignedInt>(arcs: &[Vec<Edge<I>>], num_supply: usize) -> Self {
        let c = arcs
            .iter()
            .flatten()
            .fold(0_f64, |acc, edge| acc.max(edge.cost.abs()));
        let defaults = Self::default();
        let max_eps = if c / 5.0 > defaults.tolerance.value() {
            c / 5.0
        } else {
            defaults.max_eps
        };
        let min_eps = if num_supply > 0 {
            1.0 / num_supply as f64
        } else {
            defaults.min_eps
        };
        AuctionParams {
            max_eps,
            min_eps,
            ..defaults
        }
    }

    pub fn with_max_eps(self, max_eps: f64) -> Self {
        AuctionParams { max_eps, ..self }
    }

    pub fn with_min_eps(self, min_eps: f64) -> Self {
        AuctionParams { min_eps, ..self }
    }

    pub fn with_scale(self, scale: f64) -> Self {
        AuctionParams { scale, ..self }
    }

    pub fn with_tolerance(self, tolerance: f64) -> Self {
        AuctionParams {
            tolerance: Tolerance::new(tolerance),
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        ensure!(
            self.max_eps.is_finite() && self.max_eps > 0.,
            "max_eps must be positive, got {}",
            self.max_eps
        );
        ensure!(
            self.min_eps.is_finite() && self.min_eps > 0.,
            "min_eps must be positive, got {}",
            self.min_eps
        );
        ensure!(
            self.scale > 0. && self.scale < 1.,
            "scale must lie in (0, 1), got {}",
            self.scale
        );
        ensure!(
            self.tolerance.value().is_finite() && self.tolerance.value() > 0.,
            "tolerance must be positive, got {}",
            self.tolerance.value()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{AuctionParams, Tolerance};
    use crate::solution::Edge;

    #[test]
    fn test_equal_is_relative_for_large_values() {
        let tol = Tolerance::new(1e-8);
        assert!(tol.equal(1.0, 1.0 + 1e-9));
        assert!(!tol.equal(1.0, 1.0 + 1e-7));
        assert!(tol.equal(1e9, 1e9 + 1.0));
        assert!(!tol.equal(1e9, 1e9 + 100.0));
        assert!(tol.equal(0.0, 5e-9));
    }

    #[test]
    fn test_is_integral() {
        let tol = Tolerance::default();
        assert!(tol.is_integral(6.0));
        assert!(tol.is_integral(6.0 + 1e-12));
        assert!(tol.is_integral(6.0 - 1e-12));
        assert!(!tol.is_integral(6.5));
    }

    #[test]
    fn test_for_problem() {
        let arcs: Vec<Vec<Edge<u32>>> = vec![
            vec![Edge::new(10.0, 0, 0), Edge::new(-25.0, 0, 1)],
            vec![Edge::new(5.0, 1, 1)],
        ];
        let params = AuctionParams::for_problem(&arcs, 4);
        assert_eq!(params.max_eps, 5.0);
        assert_eq!(params.min_eps, 0.25);
        assert_eq!(params.scale, 0.25);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        assert!(AuctionParams::default().validate().is_ok());
        assert!(AuctionParams::default().with_scale(1.0).validate().is_err());
        assert!(AuctionParams::default().with_scale(0.0).validate().is_err());
        assert!(AuctionParams::default().with_min_eps(0.0).validate().is_err());
        assert!(AuctionParams::default()
            .with_max_eps(f64::INFINITY)
            .validate()
            .is_err());
        assert!(AuctionParams::default()
            .with_tolerance(-1.0)
            .validate()
            .is_err());
    }
}
