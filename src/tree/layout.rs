use anyhow::{bail, Result};

use super::{NodeId, NodeKind, Tree};

/// Vertical extent of the laid-out tree. The renderer frames the plot with
/// this value, so any rescaling of node coordinates has to go through
/// [`VerticalLayout::compress`] to keep the two in step.
#[derive(Debug, Clone, Copy)]
pub struct VerticalLayout {
    pub span: f64,
}

impl VerticalLayout {
    /// Rescale every node's vertical coordinate and the span by `factor`,
    /// preserving relative spacing.
    pub fn compress(&mut self, tree: &mut Tree, factor: f64) {
        for node in &mut tree.nodes {
            node.y *= factor;
        }
        self.span *= factor;
    }
}

/// Assign a vertical coordinate to every node.
///
/// Tips receive 0, 1, 2, ... in depth-first child order; an internal node
/// sits at the midpoint of its children's extremes, so a vertical connector
/// drawn between those extremes at the node's time produces a valid
/// branching diagram.
pub fn assign_vertical_positions(tree: &mut Tree) -> Result<VerticalLayout> {
    let Some(root_id) = tree.root else {
        return Ok(VerticalLayout { span: 0.0 });
    };

    let mut state = LayoutState {
        next_tip_index: 0,
        max_y: 0.0,
    };
    assign_position(tree, root_id, &mut state)?;

    Ok(VerticalLayout { span: state.max_y })
}

struct LayoutState {
    next_tip_index: usize,
    max_y: f64,
}

fn assign_position(tree: &mut Tree, node_id: NodeId, state: &mut LayoutState) -> Result<f64> {
    let y = match tree.nodes[node_id].kind {
        NodeKind::Tip => {
            let y = state.next_tip_index as f64;
            state.next_tip_index += 1;
            state.max_y = state.max_y.max(y);
            y
        }
        NodeKind::Internal => {
            let children = tree.nodes[node_id].children.clone();
            if children.is_empty() {
                bail!("internal node {node_id} has no children; tree topology is malformed");
            }

            let mut first_y = f64::INFINITY;
            let mut last_y = f64::NEG_INFINITY;
            for child_id in children {
                let child_y = assign_position(tree, child_id, state)?;
                first_y = first_y.min(child_y);
                last_y = last_y.max(child_y);
            }

            (first_y + last_y) / 2.0
        }
    };

    tree.nodes[node_id].y = y;
    Ok(y)
}
