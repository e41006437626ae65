use std::path::Path;

use anyhow::{Context, Result};
use svg::node::element::{Circle, Group, Line, Rectangle, Text};
use svg::Document;

use crate::color::Color;
use crate::tree::highlight::Palette;
use crate::tree::Tree;

/// Marker fill for tips that are not highlighted; alpha gives the
/// semi-transparent look.
const TIP_MARKER_COLOR: Color = Color::rgba(0xbb, 0xbb, 0xbb, 153);
const GRID_COLOR: &str = "#999999";
const AXIS_TEXT_COLOR: &str = "#333333";

const BRANCH_WIDTH: f64 = 2.0;
const BRANCH_OPACITY: f64 = 0.8;
const TIP_RADIUS: f64 = 3.0;
const HIGHLIGHT_RADIUS: f64 = 5.5;

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub width: f64,
    pub height: f64,
    pub title: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 1600.0,
            height: 800.0,
            title: None,
        }
    }
}

/// Render the annotated tree to an SVG file.
///
/// Expects all three annotation passes to have run: branches are placed by
/// `absolute_time`/`y` and stroked with each child node's color.
pub fn export_svg(
    tree: &Tree,
    span: f64,
    palette: &Palette,
    options: &RenderOptions,
    path: &Path,
) -> Result<()> {
    let document = build_document(tree, span, palette, options);
    svg::save(path, &document)
        .with_context(|| format!("failed to write SVG to {}", path.display()))
}

fn build_document(tree: &Tree, span: f64, palette: &Palette, options: &RenderOptions) -> Document {
    let width = options.width;
    let height = options.height;

    let margin_x = (width * 0.05).clamp(20.0, 60.0);
    let margin_y = (height * 0.05).clamp(20.0, 40.0);
    let inner_width = width - 2.0 * margin_x;
    let inner_height = height - 2.0 * margin_y;

    let (time_min, time_max) = time_range(tree);
    let scale_x = inner_width.max(1.0) / (time_max - time_min).max(1e-6);
    let scale_y = inner_height.max(1.0) / span.max(1e-6);

    let to_x = |time: f64| margin_x + (time - time_min) * scale_x;
    let to_y = |y: f64| margin_y + y * scale_y;

    let mut document = Document::new()
        .set("width", width)
        .set("height", height)
        .set("viewBox", (0, 0, width as i32, height as i32));

    let background = Rectangle::new()
        .set("width", "100%")
        .set("height", "100%")
        .set("fill", "white");
    document = document.add(background);

    document = document.add(build_time_axis(
        time_min, time_max, &to_x, margin_y, height, width,
    ));

    let mut tree_group = Group::new().set("id", "tree");

    // Vertical connectors go beneath the horizontal branches.
    for node in tree.internal_nodes() {
        if node.children.len() < 2 {
            continue;
        }

        let mut first_y = f64::INFINITY;
        let mut last_y = f64::NEG_INFINITY;
        for &child_id in &node.children {
            let child_y = tree.nodes[child_id].y;
            first_y = first_y.min(child_y);
            last_y = last_y.max(child_y);
        }

        let x = to_x(node.absolute_time);
        let connector = Line::new()
            .set("x1", x)
            .set("y1", to_y(first_y))
            .set("x2", x)
            .set("y2", to_y(last_y))
            .set("stroke", node.color.hex())
            .set("stroke-width", BRANCH_WIDTH)
            .set("stroke-opacity", BRANCH_OPACITY);
        tree_group = tree_group.add(connector);
    }

    // One horizontal branch per non-root node, colored by the child end:
    // exact category color for tips, coarse indicator for internal nodes.
    for node in &tree.nodes {
        let Some(parent_id) = node.parent else {
            continue;
        };
        let parent = &tree.nodes[parent_id];

        let branch = Line::new()
            .set("x1", to_x(parent.absolute_time))
            .set("y1", to_y(node.y))
            .set("x2", to_x(node.absolute_time))
            .set("y2", to_y(node.y))
            .set("stroke", node.color.hex())
            .set("stroke-width", BRANCH_WIDTH)
            .set("stroke-opacity", BRANCH_OPACITY);
        tree_group = tree_group.add(branch);
    }

    // Muted tips first, highlighted tips after so they stay on top.
    for node in tree.external_nodes() {
        if node.highlighted {
            continue;
        }
        let marker = Circle::new()
            .set("cx", to_x(node.absolute_time))
            .set("cy", to_y(node.y))
            .set("r", TIP_RADIUS)
            .set("fill", TIP_MARKER_COLOR.hex())
            .set("fill-opacity", TIP_MARKER_COLOR.opacity());
        tree_group = tree_group.add(marker);
    }

    for node in tree.external_nodes() {
        if !node.highlighted {
            continue;
        }
        let marker = Circle::new()
            .set("cx", to_x(node.absolute_time))
            .set("cy", to_y(node.y))
            .set("r", HIGHLIGHT_RADIUS)
            .set("fill", node.color.hex())
            .set("stroke", "black")
            .set("stroke-width", 1.0);
        tree_group = tree_group.add(marker);
    }

    document = document.add(tree_group);
    document = document.add(build_legend(palette, margin_x, margin_y));

    if let Some(title) = &options.title {
        let text = Text::new("")
            .set("x", width * 0.5)
            .set("y", margin_y * 0.75)
            .set("font-size", 18.0)
            .set("font-weight", "bold")
            .set("fill", AXIS_TEXT_COLOR)
            .set("text-anchor", "middle")
            .add(svg::node::Text::new(title.clone()));
        document = document.add(text);
    }

    document
}

fn time_range(tree: &Tree) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for node in &tree.nodes {
        if node.absolute_time.is_finite() {
            min = min.min(node.absolute_time);
            max = max.max(node.absolute_time);
        }
    }

    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }

    (min.floor(), max.ceil())
}

fn build_time_axis(
    time_min: f64,
    time_max: f64,
    to_x: &dyn Fn(f64) -> f64,
    margin_y: f64,
    height: f64,
    width: f64,
) -> Group {
    let mut grid = Group::new().set("id", "time_axis");

    let first = time_min.floor() as i64;
    let last = time_max.ceil() as i64;
    let step = year_tick_step(last - first);

    let mut year = first - first.rem_euclid(step);
    while year <= last {
        if year >= first {
            let x = to_x(year as f64);
            let line = Line::new()
                .set("x1", x)
                .set("y1", margin_y)
                .set("x2", x)
                .set("y2", height - margin_y)
                .set("stroke", GRID_COLOR)
                .set("stroke-width", 1.0)
                .set("stroke-opacity", 0.3);
            grid = grid.add(line);

            let label = Text::new("")
                .set("x", x)
                .set("y", height - margin_y + 16.0)
                .set("font-size", 12.0)
                .set("fill", AXIS_TEXT_COLOR)
                .set("text-anchor", "middle")
                .add(svg::node::Text::new(year.to_string()));
            grid = grid.add(label);
        }
        year += step;
    }

    let axis_title = Text::new("")
        .set("x", width * 0.5)
        .set("y", height - 4.0)
        .set("font-size", 14.0)
        .set("fill", AXIS_TEXT_COLOR)
        .set("text-anchor", "middle")
        .add(svg::node::Text::new("Time (years)"));
    grid.add(axis_title)
}

/// Pick an integer year step that keeps the axis under ~20 labels.
fn year_tick_step(span_years: i64) -> i64 {
    for step in [1, 2, 5, 10, 20, 50, 100] {
        if span_years / step <= 20 {
            return step;
        }
    }
    (span_years / 20).max(1)
}

fn build_legend(palette: &Palette, margin_x: f64, margin_y: f64) -> Group {
    let mut legend = Group::new().set("id", "legend");

    let x = margin_x + 12.0;
    let mut y = margin_y + 16.0;

    let title = Text::new("")
        .set("x", x)
        .set("y", y)
        .set("font-size", 13.0)
        .set("font-weight", "bold")
        .set("fill", AXIS_TEXT_COLOR)
        .add(svg::node::Text::new("Sample types"));
    legend = legend.add(title);
    y += 18.0;

    for (category, color) in palette.entries() {
        let marker = Circle::new()
            .set("cx", x + 5.0)
            .set("cy", y - 4.0)
            .set("r", HIGHLIGHT_RADIUS)
            .set("fill", color.hex())
            .set("stroke", "black")
            .set("stroke-width", 1.0);
        let label = Text::new("")
            .set("x", x + 16.0)
            .set("y", y)
            .set("font-size", 12.0)
            .set("fill", AXIS_TEXT_COLOR)
            .add(svg::node::Text::new(category.clone()));
        legend = legend.add(marker).add(label);
        y += 18.0;
    }

    let marker = Circle::new()
        .set("cx", x + 5.0)
        .set("cy", y - 4.0)
        .set("r", TIP_RADIUS)
        .set("fill", TIP_MARKER_COLOR.hex())
        .set("fill-opacity", TIP_MARKER_COLOR.opacity());
    let label = Text::new("")
        .set("x", x + 16.0)
        .set("y", y)
        .set("font-size", 12.0)
        .set("fill", AXIS_TEXT_COLOR)
        .add(svg::node::Text::new("Other samples"));
    legend.add(marker).add(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::highlight::{propagate_highlights, TipClass};
    use crate::tree::layout::assign_vertical_positions;
    use crate::tree::testing::cherry;
    use crate::tree::time::{assign_node_times, TimeScaleConfig};
    use std::collections::HashMap;

    fn annotated_cherry() -> (Tree, f64) {
        let mut tree = cherry();

        let dates: HashMap<String, f64> =
            [("A".to_string(), 2023.0), ("B".to_string(), 2021.0)].into();
        assign_node_times(&mut tree, &dates, &TimeScaleConfig::default()).unwrap();

        let layout = assign_vertical_positions(&mut tree).unwrap();

        let classes: HashMap<String, TipClass> = [(
            "A".to_string(),
            TipClass {
                category: "NE_Central".to_string(),
                highlighted: true,
            },
        )]
        .into();
        propagate_highlights(&mut tree, &classes, &Palette::default()).unwrap();

        (tree, layout.span)
    }

    #[test]
    fn document_contains_branches_axis_and_legend() {
        let (tree, span) = annotated_cherry();
        let rendered =
            build_document(&tree, span, &Palette::default(), &RenderOptions::default()).to_string();

        assert!(rendered.contains("<svg"));
        assert!(rendered.contains("id=\"tree\""));
        assert!(rendered.contains("id=\"time_axis\""));
        assert!(rendered.contains("id=\"legend\""));
        assert!(rendered.contains("Time (years)"));
        // The highlighted tip carries its category color.
        assert!(rendered.contains("#fcb614"));
        // Grid covers the sampled years.
        assert!(rendered.contains(">2021<"));
        assert!(rendered.contains(">2023<"));
    }

    #[test]
    fn highlighted_markers_are_drawn_on_top() {
        let (tree, span) = annotated_cherry();
        let rendered =
            build_document(&tree, span, &Palette::default(), &RenderOptions::default()).to_string();

        // Branches use stroke colors, so the muted marker fill and the large
        // highlight radius each first appear on the tip circles.
        let tree_part = &rendered[rendered.find("id=\"tree\"").unwrap()..];
        let muted = tree_part.find("fill=\"#bbbbbb\"").unwrap();
        let highlighted = tree_part.find("r=\"5.5\"").unwrap();
        assert!(muted < highlighted);
    }

    #[test]
    fn tick_steps_stay_readable() {
        assert_eq!(year_tick_step(10), 1);
        assert_eq!(year_tick_step(33), 2);
        assert_eq!(year_tick_step(90), 5);
        assert_eq!(year_tick_step(900), 50);
    }
}
