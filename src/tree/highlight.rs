use std::collections::HashMap;

use anyhow::{bail, Result};

use crate::color::Color;

use super::{NodeId, NodeKind, Tree};

/// Branches and tips that lead nowhere interesting.
pub const MUTED_COLOR: Color = Color::rgb(0xcc, 0xcc, 0xcc);

/// Ancestor branches on the path to at least one highlighted tip.
pub const ANCESTOR_COLOR: Color = Color::rgb(0x66, 0x66, 0x66);

/// Classification of one tip from sample metadata.
#[derive(Debug, Clone)]
pub struct TipClass {
    pub category: String,
    pub highlighted: bool,
}

/// Category colors for highlighted tips, in legend order.
///
/// Categories without an entry fall back to [`ANCESTOR_COLOR`]; internal
/// nodes only ever use the coarse muted/ancestor pair.
#[derive(Debug, Clone)]
pub struct Palette {
    entries: Vec<(String, Color)>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            entries: vec![
                ("NE_Central".to_string(), Color::rgb(0xfc, 0xb6, 0x14)),
                ("NE_West".to_string(), Color::rgb(0x00, 0x5e, 0x63)),
                ("NE_East".to_string(), Color::rgb(0xad, 0x12, 0x2a)),
            ],
        }
    }
}

impl Palette {
    pub fn color_for(&self, category: &str) -> Option<Color> {
        self.entries
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, color)| *color)
    }

    /// Insert or replace a category color, keeping legend order stable.
    pub fn set(&mut self, category: String, color: Color) {
        match self.entries.iter_mut().find(|(name, _)| *name == category) {
            Some(entry) => entry.1 = color,
            None => self.entries.push((category, color)),
        }
    }

    pub fn entries(&self) -> &[(String, Color)] {
        &self.entries
    }
}

/// Set `highlighted` and `color` on every node.
///
/// Tips take their flag and per-category color from `classes` (keyed by tip
/// name, absent entries mean "not highlighted"). An internal node is flagged
/// when any tip beneath it is, computed as a post-order fold of child flags,
/// and gets only the coarse muted/ancestor color. Branch drawing then uses
/// the child node's color: exact for tip branches, aggregate for internal
/// ones.
pub fn propagate_highlights(
    tree: &mut Tree,
    classes: &HashMap<String, TipClass>,
    palette: &Palette,
) -> Result<()> {
    let Some(root_id) = tree.root else {
        return Ok(());
    };
    flag_subtree(tree, root_id, classes, palette)?;
    Ok(())
}

fn flag_subtree(
    tree: &mut Tree,
    node_id: NodeId,
    classes: &HashMap<String, TipClass>,
    palette: &Palette,
) -> Result<bool> {
    let (highlighted, color) = match tree.nodes[node_id].kind {
        NodeKind::Tip => {
            let class = tree.nodes[node_id]
                .name
                .as_deref()
                .and_then(|name| classes.get(name));

            match class {
                Some(class) if class.highlighted => {
                    let color = palette
                        .color_for(&class.category)
                        .unwrap_or(ANCESTOR_COLOR);
                    (true, color)
                }
                _ => (false, MUTED_COLOR),
            }
        }
        NodeKind::Internal => {
            let children = tree.nodes[node_id].children.clone();
            if children.is_empty() {
                bail!("internal node {node_id} has no children; tree topology is malformed");
            }

            let mut any = false;
            for child_id in children {
                any |= flag_subtree(tree, child_id, classes, palette)?;
            }

            let color = if any { ANCESTOR_COLOR } else { MUTED_COLOR };
            (any, color)
        }
    };

    let node = &mut tree.nodes[node_id];
    node.highlighted = highlighted;
    node.color = color;
    Ok(highlighted)
}
