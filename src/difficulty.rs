//! # Difficulty Scoring
//!
//! Node difficulty is a pure function of distance-from-start, so scores are
//! computed right after graph analysis and are available to constraints and
//! template bounds. The exponential curve is `base + factor * (2^d - 1)`:
//! it equals `base` at the spawn and outgrows the linear curve from the
//! second step on.

use crate::graph::FloorGraph;
use crate::{WarrenError, WarrenResult};
use log::debug;
use std::fmt;
use std::sync::Arc;

/// User-supplied difficulty curve over distance-from-start.
#[derive(Clone)]
pub struct DifficultyFn(Arc<dyn Fn(i32) -> f64 + Send + Sync>);

impl DifficultyFn {
    /// Wraps a curve. The curve should return 0 at distance 0 so the spawn
    /// room scores exactly `base`.
    pub fn new(f: impl Fn(i32) -> f64 + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    fn call(&self, distance: i32) -> f64 {
        (self.0)(distance)
    }
}

impl fmt::Debug for DifficultyFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DifficultyFn(..)")
    }
}

/// Scaling function applied to distance-from-start.
#[derive(Debug, Clone)]
pub enum DifficultyFunction {
    /// `raw = base + factor * d`.
    Linear,
    /// `raw = base + factor * (2^d - 1)`.
    Exponential,
    /// `raw = base + factor * f(d)`.
    Custom(DifficultyFn),
}

/// Difficulty scoring parameters.
#[derive(Debug, Clone)]
pub struct DifficultyConfig {
    pub base: f64,
    pub factor: f64,
    pub function: DifficultyFunction,
    pub max: f64,
}

impl DifficultyConfig {
    /// Linear scoring with the given base, factor, and cap.
    pub fn linear(base: f64, factor: f64, max: f64) -> Self {
        Self {
            base,
            factor,
            function: DifficultyFunction::Linear,
            max,
        }
    }

    /// Exponential scoring with the given base, factor, and cap.
    pub fn exponential(base: f64, factor: f64, max: f64) -> Self {
        Self {
            base,
            factor,
            function: DifficultyFunction::Exponential,
            max,
        }
    }

    pub(crate) fn validate(&self) -> WarrenResult<()> {
        if !self.base.is_finite() || !self.factor.is_finite() || !self.max.is_finite() {
            return Err(WarrenError::InvalidConfiguration(
                "difficulty scorer: base, factor, and max must be finite".to_string(),
            ));
        }
        if self.max < 0.0 {
            return Err(WarrenError::InvalidConfiguration(format!(
                "difficulty scorer: max must be non-negative, got {}",
                self.max
            )));
        }
        Ok(())
    }

    /// Scores one distance: `base + factor * f(d)` clamped to `[0, max]`.
    pub fn score(&self, distance: i32) -> f64 {
        let scaled = match &self.function {
            DifficultyFunction::Linear => distance as f64,
            DifficultyFunction::Exponential => (2f64).powi(distance) - 1.0,
            DifficultyFunction::Custom(f) => f.call(distance),
        };
        (self.base + self.factor * scaled).clamp(0.0, self.max)
    }
}

/// Writes difficulty onto every node from its distance-from-start.
pub(crate) fn score_graph(graph: &mut FloorGraph, config: &DifficultyConfig) {
    for id in 0..graph.node_count() as i32 {
        let distance = graph
            .node(id)
            .map(|n| n.distance_from_start())
            .unwrap_or(0);
        graph.set_difficulty(id, config.score(distance));
    }
    debug!(
        "difficulty scorer: scored {} nodes (base {}, max {})",
        graph.node_count(),
        config.base,
        config.max
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::analysis::analyze;

    #[test]
    fn test_spawn_scores_exactly_base() {
        for config in [
            DifficultyConfig::linear(2.0, 1.5, 100.0),
            DifficultyConfig::exponential(2.0, 1.5, 100.0),
        ] {
            assert_eq!(config.score(0), 2.0);
        }
        let custom = DifficultyConfig {
            base: 3.0,
            factor: 2.0,
            function: DifficultyFunction::Custom(DifficultyFn::new(|d| (d as f64).sqrt())),
            max: 50.0,
        };
        assert_eq!(custom.score(0), 3.0);
    }

    #[test]
    fn test_linear_scaling() {
        let config = DifficultyConfig::linear(1.0, 2.0, 100.0);
        assert_eq!(config.score(3), 7.0);
    }

    #[test]
    fn test_exponential_exceeds_linear() {
        let linear = DifficultyConfig::linear(1.0, 2.0, 1e9);
        let exponential = DifficultyConfig::exponential(1.0, 2.0, 1e9);
        for d in 2..10 {
            assert!(
                exponential.score(d) > linear.score(d),
                "exponential must outgrow linear at distance {d}"
            );
        }
        // And it is monotone.
        for d in 0..10 {
            assert!(exponential.score(d + 1) >= exponential.score(d));
        }
    }

    #[test]
    fn test_clamping() {
        let config = DifficultyConfig::linear(0.0, 10.0, 25.0);
        assert_eq!(config.score(100), 25.0);
        let negative = DifficultyConfig::linear(-5.0, 1.0, 25.0);
        assert_eq!(negative.score(0), 0.0);
    }

    #[test]
    fn test_score_graph_writes_nodes() {
        let mut graph = FloorGraph::new(3);
        graph.add_connection(0, 1);
        graph.add_connection(1, 2);
        analyze(&mut graph).unwrap();
        score_graph(&mut graph, &DifficultyConfig::linear(1.0, 1.0, 10.0));
        assert_eq!(graph.node(0).unwrap().difficulty(), 1.0);
        assert_eq!(graph.node(2).unwrap().difficulty(), 3.0);
    }

    #[test]
    fn test_validation() {
        assert!(DifficultyConfig::linear(0.0, 1.0, -1.0).validate().is_err());
        assert!(DifficultyConfig::linear(f64::NAN, 1.0, 5.0)
            .validate()
            .is_err());
        assert!(DifficultyConfig::linear(0.0, 1.0, 5.0).validate().is_ok());
    }
}
