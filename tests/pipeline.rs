use gitplot::{
    compute_layout, parse_log, preset, render_svg, LayoutError, LayoutOptions, TitleOptions,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

// A history with a trunk and two concurrent side branches, each closed by a
// merge, newest commit first as git log emits it.
const HISTORY: &str = "\
f10|e09 d08|
e09|c07|
d08|b06|
c07|a05|
b06|a05|
a05|904 803|
904|702|
803|702|
702|601|
601||
";

fn options() -> LayoutOptions {
    LayoutOptions {
        palette: preset(2),
        ..LayoutOptions::default()
    }
}

#[test]
fn every_commit_ends_up_placed_and_colored() {
    let mut graph = parse_log(HISTORY).unwrap();
    let opts = options();
    let mut rng = StdRng::seed_from_u64(9);
    let layout = compute_layout(&mut graph, &opts, None, &mut rng).unwrap();

    assert_eq!(layout.positions.len(), graph.len());

    let slots: HashSet<usize> = graph
        .commits()
        .iter()
        .map(|commit| commit.slot.expect("every commit carries a slot"))
        .collect();
    assert_eq!(slots, (1..=graph.len()).collect::<HashSet<_>>());

    for commit in graph.commits() {
        let lane = commit.lane.expect("every commit carries a lane");
        let color = commit.color.expect("every commit carries a color");
        assert!(lane < graph.len());
        assert!(opts.palette.contains(&color));
    }
}

#[test]
fn commits_on_the_same_slot_range_use_distinct_lanes() {
    let mut graph = parse_log(HISTORY).unwrap();
    let opts = options();
    let mut rng = StdRng::seed_from_u64(9);
    compute_layout(&mut graph, &opts, None, &mut rng).unwrap();

    // Concurrent branches: both sides of each merge must sit apart.
    let lane_of = |id: &str| graph.commit(graph.lookup(id).unwrap()).lane.unwrap();
    assert_ne!(lane_of("904"), lane_of("803"));
    assert_ne!(lane_of("e09"), lane_of("d08"));
}

#[test]
fn layout_and_render_are_reproducible_with_a_seed() {
    let opts = options();
    let title = TitleOptions::default();

    let render = |seed: u64| {
        let mut graph = parse_log(HISTORY).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        let layout = compute_layout(&mut graph, &opts, Some(&title), &mut rng).unwrap();
        render_svg(&graph, &layout, &opts, Some(("history", &title)), false).unwrap()
    };

    assert_eq!(render(21), render(21));
}

#[test]
fn title_reservation_flows_through_to_the_svg() {
    let mut graph = parse_log(HISTORY).unwrap();
    let opts = options();
    let title = TitleOptions::default();
    let mut rng = StdRng::seed_from_u64(1);
    let layout = compute_layout(&mut graph, &opts, Some(&title), &mut rng).unwrap();

    let region = layout.title_region.expect("title reserves a region");
    assert!(region.height > 0.0);
    assert_eq!(region.y + region.height, layout.size.height as f32);

    let svg = render_svg(&graph, &layout, &opts, Some(("my repo", &title)), false).unwrap();
    assert!(svg.contains(">my repo</text>"));
}

#[test]
fn unknown_parents_fail_the_whole_pipeline() {
    let result = parse_log("b2|dead|\na1||\n");
    assert!(matches!(
        result,
        Err(LayoutError::MissingParent { ref parent, .. }) if parent == "dead"
    ));
}

#[test]
fn empty_palette_fails_before_placement() {
    let mut graph = parse_log(HISTORY).unwrap();
    let opts = LayoutOptions::default();
    let mut rng = StdRng::seed_from_u64(0);
    let result = compute_layout(&mut graph, &opts, None, &mut rng);
    assert!(matches!(result, Err(LayoutError::EmptyPalette)));
    assert!(graph.commits().iter().all(|commit| commit.lane.is_none()));
}
