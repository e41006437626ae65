use std::collections::HashMap;

use anyhow::{bail, Result};

use super::{NodeId, NodeKind, Tree};

/// Fallbacks applied when a tip has no sampling date or a branch carries no
/// length. The defaults match typical recent surveillance datasets: an
/// undated tip is assumed recent, an undated internal node older.
#[derive(Debug, Clone, Copy)]
pub struct TimeScaleConfig {
    pub default_tip_time: f64,
    pub default_internal_time: f64,
    pub default_branch_length: f64,
}

impl Default for TimeScaleConfig {
    fn default() -> Self {
        Self {
            default_tip_time: 2020.0,
            default_internal_time: 2010.0,
            default_branch_length: 0.1,
        }
    }
}

/// Assign an absolute time (decimal year) to every node.
///
/// Tips take their sampling date from `dates` (keyed by tip name), falling
/// back to `default_tip_time` on a miss. Internal nodes are pinned just
/// before their earliest-dated child: `min(child times) - max(branch length,
/// default_branch_length)`. Children are always resolved before their
/// parent, so each node's time is computed exactly once.
pub fn assign_node_times(
    tree: &mut Tree,
    dates: &HashMap<String, f64>,
    config: &TimeScaleConfig,
) -> Result<()> {
    let Some(root_id) = tree.root else {
        return Ok(());
    };
    set_node_time(tree, root_id, dates, config)?;
    Ok(())
}

fn set_node_time(
    tree: &mut Tree,
    node_id: NodeId,
    dates: &HashMap<String, f64>,
    config: &TimeScaleConfig,
) -> Result<f64> {
    let kind = tree.nodes[node_id].kind;
    let time = match kind {
        NodeKind::Tip => tree.nodes[node_id]
            .name
            .as_deref()
            .and_then(|name| dates.get(name))
            .copied()
            .unwrap_or(config.default_tip_time),
        NodeKind::Internal => {
            let children = tree.nodes[node_id].children.clone();
            if children.is_empty() {
                bail!("internal node {node_id} has no children; tree topology is malformed");
            }

            let mut earliest = f64::INFINITY;
            for child_id in children {
                let child_time = set_node_time(tree, child_id, dates, config)?;
                earliest = earliest.min(child_time);
            }

            if earliest.is_finite() {
                let offset = tree.nodes[node_id]
                    .length
                    .unwrap_or(config.default_branch_length)
                    .max(config.default_branch_length);
                earliest - offset
            } else {
                config.default_internal_time
            }
        }
    };

    tree.nodes[node_id].absolute_time = time;
    Ok(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::testing::{balanced_tree, cherry, malformed_tree};

    fn dates(entries: &[(&str, f64)]) -> HashMap<String, f64> {
        entries
            .iter()
            .map(|(name, year)| (name.to_string(), *year))
            .collect()
    }

    #[test]
    fn pins_parent_before_earliest_child() {
        let mut tree = cherry();
        let dates = dates(&[("A", 2023.0), ("B", 2021.0)]);

        assign_node_times(&mut tree, &dates, &TimeScaleConfig::default()).unwrap();

        assert_eq!(tree.nodes[1].absolute_time, 2023.0);
        assert_eq!(tree.nodes[2].absolute_time, 2021.0);
        assert_eq!(tree.nodes[0].absolute_time, 2020.0);
    }

    #[test]
    fn undated_tip_gets_default_without_error() {
        let mut tree = cherry();
        let dates = dates(&[("A", 2023.0)]);
        let config = TimeScaleConfig::default();

        assign_node_times(&mut tree, &dates, &config).unwrap();

        assert_eq!(tree.nodes[2].absolute_time, config.default_tip_time);
    }

    #[test]
    fn short_branches_are_clamped_to_the_default() {
        let mut tree = cherry();
        tree.nodes[0].length = Some(0.02);
        let dates = dates(&[("A", 2023.0), ("B", 2021.0)]);

        assign_node_times(&mut tree, &dates, &TimeScaleConfig::default()).unwrap();

        // min child time 2021 minus max(0.02, 0.1)
        assert!((tree.nodes[0].absolute_time - 2020.9).abs() < 1e-9);
    }

    #[test]
    fn times_increase_from_root_to_tips() {
        let mut tree = balanced_tree();
        let dates = dates(&[("A", 2018.5), ("B", 2023.2), ("C", 2021.0), ("D", 2019.7)]);

        assign_node_times(&mut tree, &dates, &TimeScaleConfig::default()).unwrap();

        for node in &tree.nodes {
            for &child_id in &node.children {
                assert!(
                    tree.nodes[child_id].absolute_time >= node.absolute_time,
                    "child {child_id} dated before its parent {}",
                    node.id
                );
            }
        }
    }

    #[test]
    fn rerunning_the_pass_is_idempotent() {
        let mut tree = balanced_tree();
        let dates = dates(&[("A", 2018.5), ("B", 2023.2), ("C", 2021.0), ("D", 2019.7)]);
        let config = TimeScaleConfig::default();

        assign_node_times(&mut tree, &dates, &config).unwrap();
        let first: Vec<f64> = tree.nodes.iter().map(|n| n.absolute_time).collect();

        assign_node_times(&mut tree, &dates, &config).unwrap();
        let second: Vec<f64> = tree.nodes.iter().map(|n| n.absolute_time).collect();

        assert_eq!(first, second);
    }

    #[test]
    fn childless_internal_node_is_an_error() {
        let mut tree = malformed_tree();
        let dates = dates(&[("A", 2023.0)]);

        let err = assign_node_times(&mut tree, &dates, &TimeScaleConfig::default()).unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }
}
