//! Parameter grid — the search space of a grid search.

use quantbench_core::strategy::{ParamValue, StrategyParams};
use serde::{Deserialize, Serialize};

/// Ordered parameter axes. The search space is their Cartesian product.
///
/// Enumeration order is fixed: axes in insertion order, last axis varying
/// fastest, so index `k` always names the same combination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    axes: Vec<(String, Vec<ParamValue>)>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an axis. Re-adding a name replaces its values in place.
    pub fn param<V: Into<ParamValue>>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let name = name.into();
        let values: Vec<ParamValue> = values.into_iter().map(Into::into).collect();
        match self.axes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = values,
            None => self.axes.push((name, values)),
        }
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.axes.iter().map(|(n, _)| n.as_str())
    }

    pub fn axes(&self) -> &[(String, Vec<ParamValue>)] {
        &self.axes
    }

    /// Number of combinations: the product of axis lengths.
    ///
    /// A grid with no axes has exactly one (empty) combination; any empty
    /// axis makes the grid empty.
    pub fn size(&self) -> usize {
        self.axes.iter().map(|(_, v)| v.len()).product()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// The `index`-th combination in enumeration order.
    pub fn combination(&self, index: usize) -> Option<StrategyParams> {
        if index >= self.size() {
            return None;
        }
        let mut rest = index;
        let mut picked = Vec::with_capacity(self.axes.len());
        for (name, values) in self.axes.iter().rev() {
            picked.push((name.clone(), values[rest % values.len()].clone()));
            rest /= values.len();
        }
        Some(picked.into_iter().collect())
    }

    pub fn combinations(&self) -> Vec<StrategyParams> {
        (0..self.size()).filter_map(|i| self.combination(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> ParamGrid {
        ParamGrid::new()
            .param("fast_period", [5, 10])
            .param("slow_period", [20, 30, 40])
    }

    #[test]
    fn size_is_product_of_axes() {
        assert_eq!(grid().size(), 6);
        assert_eq!(grid().combinations().len(), 6);
        assert_eq!(ParamGrid::new().size(), 1);
        assert!(grid().param("x", Vec::<i64>::new()).is_empty());
    }

    #[test]
    fn last_axis_varies_fastest() {
        let combos = grid().combinations();
        let pairs: Vec<(usize, usize)> = combos
            .iter()
            .map(|p| {
                (
                    p.get_usize("fast_period").unwrap(),
                    p.get_usize("slow_period").unwrap(),
                )
            })
            .collect();
        assert_eq!(
            pairs,
            vec![(5, 20), (5, 30), (5, 40), (10, 20), (10, 30), (10, 40)]
        );
    }

    #[test]
    fn readding_axis_replaces_in_place() {
        let g = grid().param("fast_period", [1, 2, 3]);
        assert_eq!(g.names().collect::<Vec<_>>(), vec!["fast_period", "slow_period"]);
        assert_eq!(g.size(), 9);
    }

    #[test]
    fn out_of_range_index() {
        assert!(grid().combination(6).is_none());
        assert_eq!(ParamGrid::new().combination(0), Some(StrategyParams::new()));
    }

    #[test]
    fn mixed_value_types() {
        let g = ParamGrid::new()
            .param("threshold", [0.01, 0.02])
            .param("mode", ["fast", "slow"]);
        let last = g.combination(3).unwrap();
        assert_eq!(last.get_f64("threshold").unwrap(), 0.02);
        assert_eq!(last.get_str("mode").unwrap(), "slow");
    }
}
