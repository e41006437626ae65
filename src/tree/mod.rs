use phylotree::tree::{Node as PhyloNode, Tree as PhyloTree};

pub mod highlight;
pub mod layout;
pub mod time;

pub type NodeId = phylotree::tree::NodeId;

/// Explicit node role; fixed once the tree is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Tip,
    Internal,
}

/// Phylogenetic tree with an explicit node list.
#[derive(Debug, Clone)]
pub struct Tree {
    pub id: usize,
    pub newick: String,
    pub root: Option<NodeId>,
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    pub fn from_phylo(id: usize, newick: String, phylo: &PhyloTree) -> Self {
        let root = phylo.get_root().ok();
        let nodes = Self::build_nodes_from_phylo(phylo);
        Self {
            id,
            newick,
            root,
            nodes,
        }
    }

    /// Calculate the number of tip descendants for each node.
    fn calculate_clade_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.nodes.len()];

        fn calculate_size(node_id: NodeId, nodes: &[TreeNode], sizes: &mut [usize]) -> usize {
            let node = &nodes[node_id];

            if node.is_tip() {
                sizes[node_id] = 1;
                return 1;
            }

            let mut size = 0;
            for &child_id in &node.children {
                size += calculate_size(child_id, nodes, sizes);
            }

            sizes[node_id] = size;
            size
        }

        if let Some(root_id) = self.root {
            calculate_size(root_id, &self.nodes, &mut sizes);
        }

        sizes
    }

    /// Order all nodes' children by clade size.
    /// If `increasing` is true, smaller clades come first; otherwise larger clades come first.
    pub fn order_nodes(&mut self, increasing: bool) {
        let sizes = self.calculate_clade_sizes();

        for node in &mut self.nodes {
            if node.children.len() > 1 {
                node.children.sort_by(|&a, &b| {
                    let size_a = sizes[a];
                    let size_b = sizes[b];

                    if increasing {
                        size_a.cmp(&size_b)
                    } else {
                        size_b.cmp(&size_a)
                    }
                });
            }
        }
    }

    #[allow(dead_code)]
    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.root.and_then(|id| self.nodes.get(id))
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_tip()).count()
    }

    pub fn external_nodes(&self) -> Vec<&TreeNode> {
        self.nodes.iter().filter(|node| node.is_tip()).collect()
    }

    pub fn internal_nodes(&self) -> Vec<&TreeNode> {
        self.nodes.iter().filter(|node| !node.is_tip()).collect()
    }

    fn build_nodes_from_phylo(phylo: &PhyloTree) -> Vec<TreeNode> {
        let mut nodes = Vec::with_capacity(phylo.size());
        for idx in 0..phylo.size() {
            match phylo.get(&idx) {
                Ok(node) => nodes.push(TreeNode::from_phylo(node)),
                Err(_) => nodes.push(TreeNode::tip(idx, None, None)),
            }
        }
        nodes
    }
}

/// Node within a phylogenetic tree.
///
/// The annotation fields (`absolute_time`, `y`, `highlighted`, `color`) are
/// always present and start out defaulted; each of the passes in [`time`],
/// [`layout`] and [`highlight`] visits every node exactly once and assigns
/// its own field.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub id: NodeId,
    pub name: Option<String>,
    pub kind: NodeKind,
    pub length: Option<f64>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub absolute_time: f64,
    pub y: f64,
    pub highlighted: bool,
    pub color: crate::color::Color,
}

impl TreeNode {
    pub fn tip(id: NodeId, name: Option<String>, length: Option<f64>) -> Self {
        Self::new(id, name, NodeKind::Tip, length)
    }

    #[allow(dead_code)]
    pub fn internal(id: NodeId, length: Option<f64>) -> Self {
        Self::new(id, None, NodeKind::Internal, length)
    }

    fn new(id: NodeId, name: Option<String>, kind: NodeKind, length: Option<f64>) -> Self {
        Self {
            id,
            name,
            kind,
            length,
            parent: None,
            children: Vec::new(),
            absolute_time: 0.0,
            y: 0.0,
            highlighted: false,
            color: highlight::MUTED_COLOR,
        }
    }

    pub fn is_tip(&self) -> bool {
        matches!(self.kind, NodeKind::Tip)
    }

    #[allow(dead_code)]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub(crate) fn from_phylo(node: &PhyloNode) -> Self {
        let kind = if node.children.is_empty() {
            NodeKind::Tip
        } else {
            NodeKind::Internal
        };
        let mut tree_node = Self::new(node.id, node.name.clone(), kind, node.parent_edge);
        tree_node.parent = node.parent;
        tree_node.children = node.children.clone();
        tree_node
    }
}


#[cfg(test)]
mod tests {
    use super::testing::balanced_tree;
    use super::*;

    #[test]
    fn counts_tips_and_internals() {
        let tree = balanced_tree();
        assert_eq!(tree.leaf_count(), 4);
        assert_eq!(tree.external_nodes().len(), 4);
        assert_eq!(tree.internal_nodes().len(), 3);
        assert_eq!(tree.root().unwrap().id, 0);
    }

    #[test]
    fn orders_children_by_clade_size() {
        let mut tree = balanced_tree();
        // Give node 2 a third tip so the root's clades differ in size.
        tree.nodes
            .push(TreeNode::tip(7, Some("E".to_string()), Some(1.0)));
        tree.nodes[7].parent = Some(2);
        tree.nodes[2].children.push(7);

        tree.order_nodes(true);
        assert_eq!(tree.nodes[0].children, vec![1, 2]);

        tree.order_nodes(false);
        assert_eq!(tree.nodes[0].children, vec![2, 1]);
    }

    #[test]
    fn kind_derives_from_phylo_children() {
        let phylo =
            phylotree::tree::Tree::from_newick("(A:0.1,B:0.2);").expect("valid test newick");
        let tree = Tree::from_phylo(0, "(A:0.1,B:0.2);".to_string(), &phylo);

        assert_eq!(tree.leaf_count(), 2);
        for node in &tree.nodes {
            match node.kind {
                NodeKind::Tip => assert!(node.children.is_empty()),
                NodeKind::Internal => assert!(!node.children.is_empty()),
            }
        }
    }
}
