use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use phylotree::tree::{NewickFormat, Tree as PhyloTree};

use crate::tree::Tree;

/// Load every Newick tree from `path`. A file may hold several
/// semicolon-terminated trees, one per statement.
pub fn load_trees(path: &Path) -> Result<Vec<Tree>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read tree file: {}", path.display()))?;

    let trees = parse_newick(&raw)?;
    if trees.is_empty() {
        bail!("tree file did not contain any trees");
    }

    Ok(trees)
}

fn parse_newick(raw: &str) -> Result<Vec<Tree>> {
    let mut trees = Vec::new();

    for chunk in raw.split_inclusive(';') {
        let candidate = chunk.trim();
        if candidate.is_empty() {
            continue;
        }
        if !candidate.ends_with(';') {
            continue;
        }

        let newick = normalise_newick(candidate);
        let index = trees.len();
        trees.push(build_tree(index, newick)?);
    }

    Ok(trees)
}

fn build_tree(index: usize, newick: String) -> Result<Tree> {
    let phylo = PhyloTree::from_newick(&newick)
        .map_err(|err| anyhow!("failed to parse newick tree: {err}"))?;
    // Strip FigTree/BEAST comment annotations so tip names stay clean.
    let canonical_newick = phylo
        .to_formatted_newick(NewickFormat::NoComments)
        .unwrap_or_else(|_| newick.clone());

    Ok(Tree::from_phylo(index, canonical_newick, &phylo))
}

fn normalise_newick(raw: &str) -> String {
    let mut cleaned = raw.trim().trim_end_matches(';').trim().to_owned();
    cleaned.push(';');
    cleaned
}
