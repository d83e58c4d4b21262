use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::PathBuf;

use gitplot::{
    compute_layout, parse_log, parse_palette, preset, render_png, render_svg, LayoutOptions, Rgba,
    TitleAnchor, TitleOptions,
};

/// Render a git commit history as a branch graph image.
///
/// Feed it a log produced with:
/// git log --all --date-order --pretty="%h|%p|" > history.log
#[derive(Debug, Parser)]
#[command(name = "gitplot", version, about)]
struct Cli {
    /// Path to the file containing repository log data.
    #[arg(short = 'f', long = "file")]
    file: PathBuf,

    /// Title drawn onto the image; also used as the output file name.
    #[arg(short = 't', long)]
    title: Option<String>,

    /// Directory to save the graphic to.
    #[arg(short = 'o', long, default_value = ".")]
    output_dir: PathBuf,

    /// Preset palette index, or the path to a palette file.
    #[arg(short = 'c', long, default_value = "0")]
    palette: String,

    /// Title color as `r,g,b[,a]` or a 6-digit hex code.
    #[arg(long)]
    title_color: Option<Rgba>,

    /// Where in the image to draw the title.
    #[arg(short = 'p', long, value_enum, default_value_t = TitleAnchor::BottomRight)]
    title_position: TitleAnchor,

    /// Background color as `r,g,b[,a]` or a 6-digit hex code.
    #[arg(long)]
    background: Option<Rgba>,

    /// Starting width of the image in pixels.
    #[arg(short = 'W', long, default_value_t = gitplot::DEFAULT_CANVAS_WIDTH)]
    width: u32,

    /// Starting height of the image in pixels.
    #[arg(short = 'H', long, default_value_t = gitplot::DEFAULT_CANVAS_HEIGHT)]
    height: u32,

    /// Disable dynamic resizing of the image.
    #[arg(short = 'R', long)]
    no_resize: bool,

    /// Lock the output to the aspect ratio of the initial width and height.
    #[arg(short = 'k', long)]
    keep_aspect_ratio: bool,

    /// Minimum horizontal distance between points before the canvas grows.
    #[arg(long, default_value_t = gitplot::DEFAULT_HORIZONTAL_CLEARANCE)]
    horizontal_padding: u32,

    /// Minimum vertical distance to the canvas edge before the canvas grows.
    #[arg(long, default_value_t = gitplot::DEFAULT_VERTICAL_CLEARANCE)]
    vertical_padding: u32,

    /// Vertical spacing between branch lanes in pixels.
    #[arg(long, default_value_t = gitplot::DEFAULT_LANE_SPACING)]
    lane_spacing: u32,

    /// Distance from the left or right edge of the image to the title.
    #[arg(long, default_value_t = gitplot::TITLE_EDGE_OFFSET)]
    title_x_offset: f32,

    /// Distance from the top or bottom edge of the image to the title.
    #[arg(long, default_value_t = gitplot::TITLE_EDGE_OFFSET)]
    title_y_offset: f32,

    /// Seed for the color tie-break RNG, for reproducible output.
    #[arg(long)]
    seed: Option<u64>,

    /// Write an SVG document instead of a PNG.
    #[arg(long)]
    svg: bool,

    /// Draw each commit's hash next to its point.
    #[arg(long)]
    ids: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    run(Cli::parse())
}

fn run(cli: Cli) -> Result<()> {
    let log_text = fs::read_to_string(&cli.file)
        .with_context(|| format!("reading log file {}", cli.file.display()))?;
    let mut graph = parse_log(&log_text)?;
    if graph.is_empty() {
        bail!("log file {} contains no commits", cli.file.display());
    }

    let options = LayoutOptions {
        width: cli.width,
        height: cli.height,
        background: cli.background.unwrap_or_else(|| Rgba::rgb(30, 30, 30)),
        lane_spacing: cli.lane_spacing,
        min_horizontal_clearance: cli.horizontal_padding,
        min_vertical_clearance: cli.vertical_padding,
        allow_resize: !cli.no_resize,
        independent_axes: !cli.keep_aspect_ratio,
        palette: load_palette(&cli.palette)?,
    };

    let title_text = cli.title.clone().unwrap_or_default();
    let title_options = (!title_text.is_empty()).then(|| {
        let mut title = TitleOptions {
            anchor: cli.title_position,
            x_offset: cli.title_x_offset,
            y_offset: cli.title_y_offset,
            ..TitleOptions::default()
        };
        if let Some(color) = cli.title_color {
            title.color = color;
        }
        title
    });

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let layout = compute_layout(&mut graph, &options, title_options.as_ref(), &mut rng)?;

    let title_arg = title_options
        .as_ref()
        .map(|title| (title_text.as_str(), title));
    let svg = render_svg(&graph, &layout, &options, title_arg, cli.ids)?;

    let stem = if title_text.is_empty() {
        chrono::Local::now().format("%Y_%m_%d_%H%M%S").to_string()
    } else {
        title_text
    };
    let extension = if cli.svg { "svg" } else { "png" };
    let out_path = cli.output_dir.join(format!("{stem}.{extension}"));

    if cli.svg {
        fs::write(&out_path, svg)
            .with_context(|| format!("writing {}", out_path.display()))?;
    } else {
        let png = render_png(&svg, 1.0)?;
        fs::write(&out_path, png)
            .with_context(|| format!("writing {}", out_path.display()))?;
    }

    log::info!("wrote {}", out_path.display());
    println!("{}", out_path.display());
    Ok(())
}

/// A numeric choice picks a preset; anything else is read as a palette file.
fn load_palette(choice: &str) -> Result<Vec<Rgba>> {
    if !choice.is_empty() && choice.chars().all(|c| c.is_ascii_digit()) {
        return Ok(preset(choice.parse()?));
    }

    let text = fs::read_to_string(choice)
        .with_context(|| format!("reading palette file {choice}"))?;
    let colors = parse_palette(&text);
    if colors.is_empty() {
        bail!("palette file {choice} contains no recognizable colors");
    }
    Ok(colors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn numeric_palette_choice_picks_a_preset() {
        let colors = load_palette("1").unwrap();
        assert_eq!(colors, preset(1));
    }

    #[test]
    fn file_palette_choice_reads_colors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "#aa3939").unwrap();
        writeln!(file, "rgb(1, 2, 3)").unwrap();

        let colors = load_palette(file.path().to_str().unwrap()).unwrap();
        assert_eq!(colors, vec![Rgba::rgb(170, 57, 57), Rgba::rgb(1, 2, 3)]);
    }

    #[test]
    fn empty_palette_file_is_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(load_palette(file.path().to_str().unwrap()).is_err());
    }
}
