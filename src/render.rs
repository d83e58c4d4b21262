use anyhow::{anyhow, bail, Result};
use std::fmt::Write;
use tiny_skia::{Pixmap, Transform};

use crate::{
    CommitGraph, Layout, LayoutOptions, Point, TitleAnchor, TitleOptions, EDGE_STROKE_WIDTH,
    ID_FONT_SIZE, ID_LABEL_RISE, POINT_RADIUS,
};

/// Draws the laid-out graph as an SVG document: one curve per parent/child
/// edge, one filled circle per commit, optionally rotated commit-id labels
/// and a title anchored to one of the canvas edges.
pub fn render_svg(
    graph: &CommitGraph,
    layout: &Layout,
    options: &LayoutOptions,
    title: Option<(&str, &TitleOptions)>,
    draw_ids: bool,
) -> Result<String> {
    if layout.positions.len() != graph.len() {
        bail!(
            "layout holds {} positions for {} commits; run the layout over this graph first",
            layout.positions.len(),
            graph.len()
        );
    }

    let width = layout.size.width;
    let height = layout.size.height;
    let spacing = layout.slot_spacing;

    let mut svg = String::new();
    write!(
        svg,
        r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">
"#,
    )?;
    write!(
        svg,
        "  <rect width=\"100%\" height=\"100%\" fill=\"{}\" />\n",
        options.background.to_svg()
    )?;

    for ix in 0..graph.len() {
        let commit = graph.commit(ix);
        let position = layout.positions[ix];
        let color = commit
            .color
            .ok_or_else(|| anyhow!("commit '{}' carries no color", commit.id))?;

        let mut children = commit.children.clone();
        children.sort_by(|&a, &b| {
            layout.positions[a]
                .y
                .partial_cmp(&layout.positions[b].y)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        for child_ix in children {
            let child = layout.positions[child_ix];
            let child_color = graph
                .commit(child_ix)
                .color
                .ok_or_else(|| anyhow!("commit '{}' carries no color", graph.commit(child_ix).id))?;

            // An edge leaving toward a lower lane takes the lower endpoint's
            // branch color so merges read as part of the receiving branch.
            let stroke = if position.y > child.y { child_color } else { color };

            let path = edge_path(position, child, spacing);
            write!(
                svg,
                "  <path d=\"{path}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" stroke-linecap=\"round\" />\n",
                stroke.to_svg(),
                EDGE_STROKE_WIDTH
            )?;
        }
    }

    for ix in 0..graph.len() {
        let commit = graph.commit(ix);
        let position = layout.positions[ix];
        let color = commit
            .color
            .ok_or_else(|| anyhow!("commit '{}' carries no color", commit.id))?;

        write!(
            svg,
            "  <circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"{}\" fill=\"{}\" />\n",
            position.x,
            position.y,
            POINT_RADIUS,
            color.to_svg()
        )?;

        if draw_ids {
            write!(
                svg,
                "  <text x=\"{:.1}\" y=\"{:.1}\" transform=\"rotate(270 {:.1} {:.1})\" fill=\"#ff00ff\" font-size=\"{}\" font-style=\"italic\" font-family=\"monospace\">{}</text>\n",
                position.x,
                position.y - ID_LABEL_RISE,
                position.x,
                position.y,
                ID_FONT_SIZE,
                escape_xml(&commit.id)
            )?;
        }
    }

    if let Some((text, title_options)) = title {
        if !text.is_empty() {
            let (x, y, anchor, baseline) =
                title_placement(title_options, width as f32, height as f32);
            write!(
                svg,
                "  <text x=\"{x:.1}\" y=\"{y:.1}\" fill=\"{}\" font-size=\"{}\" font-family=\"{}\" font-weight=\"bold\" font-style=\"italic\" text-anchor=\"{anchor}\" dominant-baseline=\"{baseline}\">{}</text>\n",
                title_options.color.to_svg(),
                title_options.font_size,
                escape_xml(&title_options.font_family),
                escape_xml(text)
            )?;
        }
    }

    svg.push_str("</svg>\n");
    Ok(svg)
}

/// Cubic curve between a commit and one of its children. Short hops are a
/// single Bézier; longer ones get a straight run so the curve stays near
/// the endpoints instead of sagging across the canvas.
fn edge_path(from: Point, to: Point, spacing: f32) -> String {
    let reach = spacing * 2.0;
    let dx = (from.x - to.x).abs();

    if dx > reach + 1.0 && from.y != to.y {
        if to.y <= from.y {
            // Climbing: curve up right away, then run straight to the child.
            let pivot_x = from.x + reach;
            format!(
                "M {:.1},{:.1} C {:.1},{:.1} {:.1},{:.1} {:.1},{:.1} L {:.1},{:.1}",
                from.x, from.y, pivot_x, from.y, from.x, to.y, pivot_x, to.y, to.x, to.y
            )
        } else {
            // Descending: run straight first, curve down at the child's side.
            let pivot_x = to.x - reach;
            format!(
                "M {:.1},{:.1} L {:.1},{:.1} C {:.1},{:.1} {:.1},{:.1} {:.1},{:.1}",
                from.x,
                from.y,
                pivot_x,
                from.y,
                pivot_x + reach,
                from.y,
                to.x - reach,
                to.y,
                to.x,
                to.y
            )
        }
    } else {
        format!(
            "M {:.1},{:.1} C {:.1},{:.1} {:.1},{:.1} {:.1},{:.1}",
            from.x,
            from.y,
            from.x + reach,
            from.y,
            to.x - reach,
            to.y,
            to.x,
            to.y
        )
    }
}

fn title_placement(
    options: &TitleOptions,
    width: f32,
    height: f32,
) -> (f32, f32, &'static str, &'static str) {
    match options.anchor {
        TitleAnchor::TopLeft => (options.x_offset, options.y_offset, "start", "hanging"),
        TitleAnchor::TopCenter => (width / 2.0, options.y_offset, "middle", "hanging"),
        TitleAnchor::TopRight => (width - options.x_offset, options.y_offset, "end", "hanging"),
        TitleAnchor::RightEdge => (width - options.x_offset, height / 2.0, "end", "middle"),
        TitleAnchor::BottomRight => (
            width - options.x_offset,
            height - options.y_offset,
            "end",
            "auto",
        ),
        TitleAnchor::BottomCenter => (width / 2.0, height - options.y_offset, "middle", "auto"),
        TitleAnchor::BottomLeft => (options.x_offset, height - options.y_offset, "start", "auto"),
        TitleAnchor::LeftEdge => (options.x_offset, height / 2.0, "start", "middle"),
    }
}

/// Rasterizes a rendered SVG document to PNG bytes.
pub fn render_png(svg: &str, scale: f32) -> Result<Vec<u8>> {
    if scale <= 0.0 {
        bail!("scale must be greater than zero when rendering PNG output");
    }

    let mut svg_options = resvg::usvg::Options::default();
    svg_options.fontdb_mut().load_system_fonts();

    let tree = resvg::usvg::Tree::from_str(svg, &svg_options)
        .map_err(|err| anyhow!("failed to parse generated SVG for PNG export: {err}"))?;

    let size = tree.size().to_int_size();
    let scaled_width = ((size.width() as f32) * scale).ceil();
    let scaled_height = ((size.height() as f32) * scale).ceil();

    if !scaled_width.is_finite() || !scaled_height.is_finite() {
        bail!("scaled dimensions are not finite; try a smaller scale factor");
    }
    if scaled_width < 1.0 || scaled_height < 1.0 {
        bail!("scaled dimensions collapsed below 1px; try a larger scale factor");
    }
    if scaled_width > u32::MAX as f32 || scaled_height > u32::MAX as f32 {
        bail!("scaled dimensions exceed supported limits; try a smaller scale factor");
    }

    let scaled_width = scaled_width as u32;
    let scaled_height = scaled_height as u32;

    let mut pixmap = Pixmap::new(scaled_width, scaled_height).ok_or_else(|| {
        anyhow!("failed to allocate {scaled_width}x{scaled_height} surface for PNG export")
    })?;

    let transform = Transform::from_scale(scale, scale);
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    let png_data = pixmap
        .encode_png()
        .map_err(|err| anyhow!("failed to encode PNG output: {err}"))?;

    Ok(png_data)
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compute_layout, parse_log, preset, LayoutOptions};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rendered(title: Option<(&str, &TitleOptions)>, draw_ids: bool) -> String {
        let input = "\
d4|b2 c3|
c3|a1|
b2|a1|
a1||
";
        let mut graph = parse_log(input).unwrap();
        let options = LayoutOptions {
            palette: preset(0),
            ..LayoutOptions::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let layout =
            compute_layout(&mut graph, &options, title.map(|(_, t)| t), &mut rng).unwrap();
        render_svg(&graph, &layout, &options, title, draw_ids).unwrap()
    }

    #[test]
    fn draws_one_circle_per_commit() {
        let svg = rendered(None, false);
        assert_eq!(svg.matches("<circle").count(), 4);
        assert!(svg.contains("fill=\"#1e1e1e\""));
        assert!(!svg.contains("<text"));
    }

    #[test]
    fn draws_an_edge_per_relation() {
        let svg = rendered(None, false);
        assert_eq!(svg.matches("<path").count(), 4);
    }

    #[test]
    fn writes_the_title_at_its_anchor() {
        let title_options = TitleOptions::default();
        let svg = rendered(Some(("release <1.0>", &title_options)), false);
        assert!(svg.contains("release &lt;1.0&gt;"));
        assert!(svg.contains("text-anchor=\"end\""));
    }

    #[test]
    fn labels_commits_when_asked() {
        let svg = rendered(None, true);
        assert_eq!(svg.matches("rotate(270").count(), 4);
        assert!(svg.contains(">a1</text>"));
    }

    #[test]
    fn refuses_a_layout_for_a_different_graph() {
        let mut graph = parse_log("b2|a1|\na1||\n").unwrap();
        let options = LayoutOptions {
            palette: preset(0),
            ..LayoutOptions::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let layout = compute_layout(&mut graph, &options, None, &mut rng).unwrap();

        let other = parse_log("c3|b2|\nb2|a1|\na1||\n").unwrap();
        assert!(render_svg(&other, &layout, &options, None, false).is_err());
    }

    #[test]
    fn title_placement_covers_all_anchors() {
        let mut options = TitleOptions::default();
        for (anchor, expected) in [
            (TitleAnchor::TopLeft, "start"),
            (TitleAnchor::TopCenter, "middle"),
            (TitleAnchor::TopRight, "end"),
            (TitleAnchor::RightEdge, "end"),
            (TitleAnchor::BottomRight, "end"),
            (TitleAnchor::BottomCenter, "middle"),
            (TitleAnchor::BottomLeft, "start"),
            (TitleAnchor::LeftEdge, "start"),
        ] {
            options.anchor = anchor;
            let (x, y, text_anchor, _) = title_placement(&options, 1000.0, 500.0);
            assert_eq!(text_anchor, expected);
            assert!(x >= 0.0 && x <= 1000.0);
            assert!(y >= 0.0 && y <= 500.0);
        }
    }
}
