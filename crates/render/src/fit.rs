//! Fit geometry

use serde::{Deserialize, Serialize};

/// How a page is fitted into the target box
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitMode {
    /// Whole page visible: the smaller of the two ratios wins
    #[default]
    Contain,

    /// Only the width is constrained; tall pages overflow vertically
    Width,
}

impl std::str::FromStr for FitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "contain" => Ok(Self::Contain),
            "width" => Ok(Self::Width),
            other => Err(format!("unknown fit mode '{other}' (expected contain or width)")),
        }
    }
}

impl std::fmt::Display for FitMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Contain => write!(f, "contain"),
            Self::Width => write!(f, "width"),
        }
    }
}

/// Fidelity of a displayed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Fast nearest-neighbour scaling shown while the real render is in flight
    Preview,

    /// Final high-quality render
    Crisp,
}

/// Output size for an `orig_w`x`orig_h` image fitted into `target_w`x`target_h`.
///
/// Aspect ratio is preserved and both sides are at least 1.
pub fn fit_dimensions(
    orig_w: u32,
    orig_h: u32,
    target_w: u32,
    target_h: u32,
    mode: FitMode,
) -> (u32, u32) {
    if orig_w == 0 || orig_h == 0 {
        return (target_w.max(1), target_h.max(1));
    }

    let ratio_w = target_w as f64 / orig_w as f64;
    let scale = match mode {
        FitMode::Contain => ratio_w.min(target_h as f64 / orig_h as f64),
        FitMode::Width => ratio_w,
    };

    let width = (orig_w as f64 * scale).round().max(1.0) as u32;
    let height = (orig_h as f64 * scale).round().max(1.0) as u32;
    (width, height)
}
