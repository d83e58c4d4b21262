use lazy_static::lazy_static;
use regex::Regex;

use crate::Rgba;

const CLASSIC: [Rgba; 15] = [
    Rgba::rgb(139, 0, 0),
    Rgba::rgb(255, 0, 0),
    Rgba::rgb(255, 255, 0),
    Rgba::rgb(154, 205, 50),
    Rgba::rgb(173, 255, 47),
    Rgba::rgb(0, 100, 0),
    Rgba::rgb(0, 139, 139),
    Rgba::rgb(0, 255, 255),
    Rgba::rgb(0, 0, 255),
    Rgba::rgb(0, 0, 139),
    Rgba::rgb(138, 43, 226),
    Rgba::rgb(238, 130, 238),
    Rgba::rgb(102, 51, 153),
    Rgba::rgb(128, 0, 128),
    Rgba::rgb(199, 21, 133),
];

const GRAYSCALE: [Rgba; 8] = [
    Rgba::rgb(50, 50, 50),
    Rgba::rgb(70, 70, 70),
    Rgba::rgb(90, 90, 90),
    Rgba::rgb(110, 110, 110),
    Rgba::rgb(130, 130, 130),
    Rgba::rgb(150, 150, 150),
    Rgba::rgb(170, 170, 170),
    Rgba::rgb(190, 190, 190),
];

const PASTEL: [Rgba; 20] = [
    Rgba::rgb(170, 57, 57),
    Rgba::rgb(255, 170, 170),
    Rgba::rgb(212, 106, 106),
    Rgba::rgb(128, 21, 21),
    Rgba::rgb(85, 0, 0),
    Rgba::rgb(170, 108, 57),
    Rgba::rgb(255, 209, 170),
    Rgba::rgb(212, 154, 106),
    Rgba::rgb(128, 69, 21),
    Rgba::rgb(85, 39, 0),
    Rgba::rgb(34, 102, 102),
    Rgba::rgb(102, 153, 153),
    Rgba::rgb(64, 127, 127),
    Rgba::rgb(13, 77, 77),
    Rgba::rgb(0, 51, 51),
    Rgba::rgb(45, 136, 45),
    Rgba::rgb(136, 204, 136),
    Rgba::rgb(85, 170, 85),
    Rgba::rgb(17, 102, 17),
    Rgba::rgb(0, 68, 0),
];

const DEEP: [Rgba; 20] = [
    Rgba::rgb(103, 0, 0),
    Rgba::rgb(65, 2, 2),
    Rgba::rgb(79, 0, 0),
    Rgba::rgb(155, 0, 0),
    Rgba::rgb(211, 0, 0),
    Rgba::rgb(103, 46, 0),
    Rgba::rgb(65, 30, 2),
    Rgba::rgb(79, 36, 0),
    Rgba::rgb(155, 70, 0),
    Rgba::rgb(211, 96, 0),
    Rgba::rgb(0, 62, 62),
    Rgba::rgb(1, 39, 39),
    Rgba::rgb(0, 47, 47),
    Rgba::rgb(0, 93, 93),
    Rgba::rgb(0, 127, 127),
    Rgba::rgb(0, 82, 0),
    Rgba::rgb(1, 52, 1),
    Rgba::rgb(0, 63, 0),
    Rgba::rgb(0, 124, 0),
    Rgba::rgb(0, 169, 0),
];

const PRESETS: [&[Rgba]; 4] = [&CLASSIC, &GRAYSCALE, &PASTEL, &DEEP];

/// Returns one of the built-in palettes, wrapping out-of-range indices
/// around so any number picks something.
pub fn preset(index: usize) -> Vec<Rgba> {
    PRESETS[index % PRESETS.len()].to_vec()
}

pub fn preset_count() -> usize {
    PRESETS.len()
}

lazy_static! {
    static ref HEX_CODE: Regex = Regex::new(r"(?i)([0-9a-f]{6})").expect("hex pattern compiles");
    static ref RGB_CALL: Regex =
        Regex::new(r"(?i)rgba?\(\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)").expect("rgb pattern compiles");
}

/// Extracts colors from free-form palette text, one color per line. Both
/// 6-digit hex codes and `rgb()`/`rgba()` notation are recognized; anything
/// else is ignored.
pub fn parse_palette(text: &str) -> Vec<Rgba> {
    let mut colors = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }

        if let Some(captures) = RGB_CALL.captures(line) {
            let channels: Option<Vec<u8>> = (1..=3)
                .map(|ix| captures.get(ix).and_then(|m| m.as_str().parse().ok()))
                .collect();
            if let Some([r, g, b]) = channels.as_deref() {
                colors.push(Rgba::rgb(*r, *g, *b));
                continue;
            }
        }

        if let Some(captures) = HEX_CODE.captures(line) {
            if let Ok(color) = captures[1].parse::<Rgba>() {
                colors.push(color);
            }
        }
    }

    colors
}
