use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use log::{info, warn};

use crate::color::Color;
use crate::export::svg::{export_svg, RenderOptions};
use crate::io;
use crate::metadata::SampleTable;
use crate::summary::YearSummary;
use crate::tree::highlight::{propagate_highlights, Palette, TipClass};
use crate::tree::layout::assign_vertical_positions;
use crate::tree::time::{assign_node_times, TimeScaleConfig};
use crate::tree::Tree;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "chronotree",
    about = "Render a time-scaled phylogenetic tree with highlighted samples as SVG."
)]
pub struct AppConfig {
    /// Tree file to load (Newick).
    #[arg(value_name = "TREE_FILE")]
    pub tree_path: PathBuf,

    /// Sample metadata table (TSV with strain, date and Region columns).
    #[arg(short, long, value_name = "FILE")]
    pub metadata: PathBuf,

    /// Write the rendered tree to this SVG file.
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Canvas width in pixels.
    #[arg(long, default_value_t = 1600.0)]
    pub width: f64,

    /// Canvas height in pixels.
    #[arg(long, default_value_t = 800.0)]
    pub height: f64,

    /// Compression factor applied to the vertical axis.
    #[arg(long, default_value_t = 0.6)]
    pub compression: f64,

    /// Region whose samples are highlighted; repeat for several regions.
    #[arg(long = "highlight-region", value_name = "REGION")]
    pub highlight_regions: Vec<String>,

    /// Sampling year that highlighted samples must match.
    #[arg(long, default_value_t = 2023)]
    pub highlight_year: i32,

    /// Override or add a palette entry (REGION=#RRGGBB); repeatable.
    #[arg(long = "palette", value_name = "REGION=HEX")]
    pub palette_overrides: Vec<String>,

    /// Order children by clade size before layout (smaller clades first).
    #[arg(long)]
    pub ladderize: bool,

    /// Print genome counts by year and cutoff statistics.
    #[arg(long)]
    pub summary: bool,

    /// Cutoff year for the summary statistics.
    #[arg(long, default_value_t = 2019)]
    pub cutoff_year: i32,

    /// Plot title.
    #[arg(long)]
    pub title: Option<String>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

pub struct App;

impl App {
    pub fn run(config: &AppConfig) -> Result<()> {
        let mut trees = io::load_trees(&config.tree_path)?;
        let table = SampleTable::from_path(&config.metadata)?;
        info!(
            "Loaded {} tree(s) and {} metadata row(s).",
            trees.len(),
            table.len()
        );

        if trees.len() > 1 {
            warn!("Tree file holds {} trees; rendering the first.", trees.len());
        }
        let mut tree = trees.swap_remove(0);

        if config.ladderize {
            tree.order_nodes(true);
        }

        let dates = table.tip_dates();
        let classes = table.classify(&config.highlight_regions, config.highlight_year);
        let palette = build_palette(&config.palette_overrides)?;

        assign_node_times(&mut tree, &dates, &TimeScaleConfig::default())?;
        let mut layout = assign_vertical_positions(&mut tree)?;
        if config.compression != 1.0 {
            layout.compress(&mut tree, config.compression);
        }
        propagate_highlights(&mut tree, &classes, &palette)?;

        report_tree(&tree, &classes);

        if let Some(output) = &config.output {
            let options = RenderOptions {
                width: config.width,
                height: config.height,
                title: config.title.clone(),
            };
            export_svg(&tree, layout.span, &palette, &options, output)?;
            info!("Wrote {}", output.display());
        }

        if config.summary {
            YearSummary::from_table(&table).print_report(config.cutoff_year);
        }

        Ok(())
    }
}

fn build_palette(overrides: &[String]) -> Result<Palette> {
    let mut palette = Palette::default();
    for entry in overrides {
        let (category, color) = parse_palette_override(entry)?;
        palette.set(category, color);
    }
    Ok(palette)
}

fn parse_palette_override(entry: &str) -> Result<(String, Color)> {
    let Some((category, hex)) = entry.split_once('=') else {
        bail!("palette entry '{entry}' is not of the form REGION=#RRGGBB");
    };

    let category = category.trim();
    if category.is_empty() {
        bail!("palette entry '{entry}' names no region");
    }

    Ok((category.to_string(), Color::from_hex(hex)?))
}

fn report_tree(tree: &Tree, classes: &HashMap<String, TipClass>) {
    println!("Tree statistics:");
    println!("  tips: {}", tree.leaf_count());
    println!("  internal nodes: {}", tree.internal_nodes().len());
    if let Some(root) = tree.root() {
        println!("  root dated to {:.2}", root.absolute_time);
    }

    let mut by_category: BTreeMap<&str, usize> = BTreeMap::new();
    for node in tree.external_nodes() {
        if !node.highlighted {
            continue;
        }
        let class = node
            .name
            .as_deref()
            .and_then(|name| classes.get(name));
        if let Some(class) = class {
            *by_category.entry(class.category.as_str()).or_default() += 1;
        }
    }

    let highlighted: usize = by_category.values().sum();
    println!("  highlighted tips: {highlighted}");
    for (category, count) in by_category {
        println!("    {category}: {count}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_palette_overrides() {
        let (category, color) = parse_palette_override("NE_West=#005e63").unwrap();
        assert_eq!(category, "NE_West");
        assert_eq!(color, Color::rgb(0x00, 0x5e, 0x63));
    }

    #[test]
    fn rejects_malformed_palette_overrides() {
        assert!(parse_palette_override("NE_West").is_err());
        assert!(parse_palette_override("=#005e63").is_err());
        assert!(parse_palette_override("NE_West=teal").is_err());
    }

    #[test]
    fn overrides_replace_default_entries() {
        let palette = build_palette(&["NE_East=#123456".to_string()]).unwrap();
        assert_eq!(
            palette.color_for("NE_East"),
            Some(Color::rgb(0x12, 0x34, 0x56))
        );
        // Untouched defaults survive.
        assert_eq!(
            palette.color_for("NE_Central"),
            Some(Color::rgb(0xfc, 0xb6, 0x14))
        );
    }
}
