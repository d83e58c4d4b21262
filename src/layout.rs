use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use crate::{
    CanvasSize, CommitGraph, LayoutError, LayoutOptions, Point, Rgba, TitleOptions,
    TITLE_BAND_FACTOR,
};

/// Horizontal interval occupied by one branch, plus the lane the branch was
/// parked on. Spans with intersecting intervals must end up on different
/// lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub lane: usize,
}

impl Span {
    /// Inclusive interval intersection, covering containment and partial
    /// overlap on either side.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Pixel rectangle reserved for the image title. The band sits at the
/// bottom of the canvas; the commit rows are centered in the space above it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TitleRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Finished layout: one pixel position per commit (indexed like the graph
/// arena), the final canvas size after scaling, and the horizontal spacing
/// the renderer uses for curve control points.
#[derive(Debug, Clone)]
pub struct Layout {
    pub positions: Vec<Point>,
    pub size: CanvasSize,
    pub slot_spacing: f32,
    pub title_region: Option<TitleRegion>,
}

/// Runs every layout pass over the graph in order: horizontal slots, branch
/// extraction, lane assignment, color balancing, coordinate mapping.
///
/// The `slot`/`lane`/`color` fields of the graph's commits are populated as
/// a side effect; positions are derived and returned in the [`Layout`].
/// The RNG only breaks ties between equally-rare palette colors, so a
/// seeded RNG makes the whole layout reproducible.
pub fn compute_layout(
    graph: &mut CommitGraph,
    options: &LayoutOptions,
    title: Option<&TitleOptions>,
    rng: &mut impl Rng,
) -> Result<Layout, LayoutError> {
    if options.palette.is_empty() {
        return Err(LayoutError::EmptyPalette);
    }

    if graph.is_empty() {
        return Ok(Layout {
            positions: Vec::new(),
            size: CanvasSize {
                width: options.width,
                height: options.height,
            },
            slot_spacing: 0.0,
            title_region: None,
        });
    }

    assign_slots(graph);
    let branches = extract_branches(graph)?;
    log::info!(
        "extracted {} branches from {} commits",
        branches.len(),
        graph.len()
    );
    let groups = assign_lanes(graph, &branches);
    balance_colors(graph, &groups, &options.palette, rng)?;
    Ok(map_coordinates(graph, options, title))
}

/// Assigns `slot = index + 1` over the oldest-first sequence. Commits that
/// already carry a slot keep it, so re-entry is a no-op.
pub(crate) fn assign_slots(graph: &mut CommitGraph) {
    for ix in 0..graph.len() {
        let commit = graph.commit_mut(ix);
        if commit.slot.is_none() {
            commit.slot = Some(ix + 1);
        }
    }
}

/// Partitions the commits into branches, each the shortest path from the
/// first still-unassigned commit to the frontier of already-placed ones.
///
/// The frontier is seeded with the sink (the most recent commit). When a
/// commit cannot reach the frontier but still has children, the search
/// retries against the graph's other endpoints; both failing is an
/// internal-invariant violation for a valid DAG.
pub(crate) fn extract_branches(graph: &CommitGraph) -> Result<Vec<Vec<usize>>, LayoutError> {
    let node_count = graph.len();
    let sink = node_count - 1;
    let endpoints: HashSet<usize> = (0..node_count)
        .filter(|&ix| ix != sink && graph.commit(ix).children.is_empty())
        .collect();

    let mut frontier: HashSet<usize> = HashSet::from([sink]);
    let mut pending = vec![true; node_count];
    let mut remaining = node_count;
    let mut cursor = 0_usize;
    let mut branches: Vec<Vec<usize>> = Vec::new();

    while remaining > 0 {
        while !pending[cursor] {
            cursor += 1;
        }
        let origin = cursor;
        log::debug!(
            "grouped {} of {} commits",
            node_count - remaining,
            node_count
        );

        let branch = if let Some(path) = shortest_path(graph, origin, &frontier) {
            path
        } else if !graph.commit(origin).children.is_empty() {
            shortest_path(graph, origin, &endpoints).ok_or_else(|| LayoutError::NoLayoutFound {
                id: graph.commit(origin).id.clone(),
            })?
        } else {
            vec![origin]
        };

        for &ix in &branch {
            frontier.insert(ix);
            if pending[ix] {
                pending[ix] = false;
                remaining -= 1;
            }
        }
        branches.push(branch);
    }

    Ok(branches)
}

/// Dijkstra with unit weights over child edges, stopping at the first
/// target reached. Ties between equally-distant commits break toward the
/// lowest horizontal slot, which keeps extraction deterministic.
fn shortest_path(
    graph: &CommitGraph,
    origin: usize,
    targets: &HashSet<usize>,
) -> Option<Vec<usize>> {
    if targets.is_empty() {
        return None;
    }

    let node_count = graph.len();
    let mut dist = vec![usize::MAX; node_count];
    let mut prev: Vec<Option<usize>> = vec![None; node_count];
    let mut settled = vec![false; node_count];
    let mut heap = BinaryHeap::new();

    dist[origin] = 0;
    heap.push(Reverse((0_usize, graph.commit(origin).slot.unwrap_or(0), origin)));

    while let Some(Reverse((distance, _, ix))) = heap.pop() {
        if settled[ix] {
            continue;
        }
        settled[ix] = true;

        if targets.contains(&ix) {
            let mut path = vec![ix];
            let mut current = ix;
            while let Some(previous) = prev[current] {
                path.push(previous);
                current = previous;
            }
            path.reverse();
            return Some(path);
        }

        for &child in &graph.commit(ix).children {
            let next = distance + 1;
            if next < dist[child] {
                dist[child] = next;
                prev[child] = Some(ix);
                heap.push(Reverse((next, graph.commit(child).slot.unwrap_or(0), child)));
            }
        }
    }

    None
}

/// Gives every branch a lane such that branches with intersecting
/// horizontal spans never share one. Returns the per-branch lists of
/// freshly placed commits, which are the units of color assignment.
///
/// Only the commits that did not already carry a lane are placed; a branch
/// whose commits were all placed by earlier branches is a no-op.
pub(crate) fn assign_lanes(graph: &mut CommitGraph, branches: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let mut spans: Vec<Span> = Vec::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for branch in branches {
        let fresh: Vec<usize> = branch
            .iter()
            .copied()
            .filter(|&ix| graph.commit(ix).lane.is_none())
            .collect();
        if fresh.is_empty() {
            continue;
        }

        let slot = |ix: usize| graph.commit(ix).slot.unwrap_or(0);

        // The branch runs origin-first, so the fresh commits form a prefix
        // and the entry past them (if any) is the attachment point.
        let end_slot = if fresh.len() + 1 >= branch.len() {
            branch.last().map(|&ix| slot(ix)).unwrap_or(0)
        } else {
            slot(branch[fresh.len()])
        };
        let end = end_slot.saturating_sub(1);

        let first = fresh[0];
        let start = if graph.commit(first).parents.is_empty() {
            slot(first)
        } else {
            graph
                .commit(first)
                .parents
                .iter()
                .map(|&p| slot(p))
                .max()
                .unwrap_or(0)
        };

        let candidate = Span { start, end, lane: 0 };
        let occupied: Vec<usize> = spans
            .iter()
            .filter(|span| span.overlaps(&candidate))
            .map(|span| span.lane)
            .collect();

        let lane = if occupied.is_empty() {
            0
        } else {
            let floor = branch
                .first()
                .and_then(|&ix| {
                    graph
                        .commit(ix)
                        .parents
                        .iter()
                        .filter_map(|&p| graph.commit(p).lane)
                        .min()
                })
                .unwrap_or(0);
            first_free_lane(floor, &occupied)
        };

        for &ix in &fresh {
            graph.commit_mut(ix).lane = Some(lane);
        }
        spans.push(Span { start, end, lane });
        groups.push(fresh);
    }

    groups
}

/// First-fit scan upward from `floor` for a lane no overlapping span uses.
fn first_free_lane(floor: usize, occupied: &[usize]) -> usize {
    let mut lane = floor;
    while occupied.contains(&lane) {
        lane += 1;
    }
    lane
}

/// Assigns one palette color per branch, always drawing from the colors
/// used least so far and breaking ties uniformly at random.
pub(crate) fn balance_colors(
    graph: &mut CommitGraph,
    groups: &[Vec<usize>],
    palette: &[Rgba],
    rng: &mut impl Rng,
) -> Result<(), LayoutError> {
    if palette.is_empty() {
        return Err(LayoutError::EmptyPalette);
    }

    let mut usage = vec![0_usize; palette.len()];

    for group in groups {
        let rarest = usage.iter().copied().min().unwrap_or(0);
        let candidates: Vec<usize> = usage
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count == rarest)
            .map(|(ix, _)| ix)
            .collect();
        let choice = candidates[rng.gen_range(0..candidates.len())];
        usage[choice] += 1;

        for &ix in group {
            graph.commit_mut(ix).color = Some(palette[choice]);
        }
    }

    Ok(())
}

/// Converts `(slot, lane)` pairs into pixel coordinates, scaling the canvas
/// up first when the configured clearances would be violated.
pub(crate) fn map_coordinates(
    graph: &CommitGraph,
    options: &LayoutOptions,
    title: Option<&TitleOptions>,
) -> Layout {
    let node_count = graph.len();
    let mut slot_spacing = options.width as f32 / (node_count as f32 * 2.0);
    let max_lane = graph
        .commits()
        .iter()
        .filter_map(|commit| commit.lane)
        .max()
        .unwrap_or(0) as u32;

    let title_band = title
        .map(|t| (t.font_size.ceil() + t.y_offset * TITLE_BAND_FACTOR).ceil() as u32)
        .unwrap_or(0);

    let mut width_multiplier = 1_u32;
    let mut height_multiplier = 1_u32;

    if options.allow_resize {
        if slot_spacing < options.min_horizontal_clearance as f32 {
            width_multiplier = ((options.min_horizontal_clearance as f32
                * node_count as f32
                * 2.0)
                / options.width as f32)
                .ceil()
                .max(1.0) as u32;
            slot_spacing =
                (options.width * width_multiplier) as f32 / (node_count as f32 * 2.0);
        }

        let usable_height = options.height.saturating_sub(title_band);
        let used_height = max_lane * options.lane_spacing;
        let edge_gap = i64::from(usable_height) - i64::from(used_height);
        if edge_gap < i64::from(options.min_vertical_clearance) {
            height_multiplier = ((used_height + options.min_vertical_clearance) as f32
                / options.height as f32)
                .ceil()
                .max(1.0) as u32;
        }

        if !options.independent_axes {
            width_multiplier = width_multiplier.max(height_multiplier);
            height_multiplier = width_multiplier;
        }
    }

    let size = CanvasSize {
        width: options.width * width_multiplier,
        height: options.height * height_multiplier,
    };

    let usable = i64::from(size.height.saturating_sub(title_band));
    let used = i64::from(max_lane * options.lane_spacing);
    let bottom_line = (usable - used) / 2 + used;

    let positions = graph
        .commits()
        .iter()
        .map(|commit| {
            let slot = commit.slot.unwrap_or(0) as f32;
            let lane = commit.lane.unwrap_or(0) as f32;
            Point {
                x: slot / node_count as f32 * size.width as f32 - slot_spacing,
                y: bottom_line as f32 - lane * options.lane_spacing as f32,
            }
        })
        .collect();

    let title_region = title.map(|_| TitleRegion {
        x: 0.0,
        y: size.height.saturating_sub(title_band) as f32,
        width: size.width as f32,
        height: title_band as f32,
    });

    Layout {
        positions,
        size,
        slot_spacing,
        title_region,
    }
}
