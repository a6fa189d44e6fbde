use serde::{Deserialize, Serialize};

use crate::ChartFormat;

/// Canonical tween curve of an event.
///
/// The numbered codes 1..=29 used by both supported formats map onto the named
/// variants. A code that has no named counterpart is kept verbatim in
/// [`Easing::Unmapped`] together with the format it came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Easing {
    #[default]
    Linear,
    SineOut,
    SineIn,
    QuadOut,
    QuadIn,
    SineInOut,
    QuadInOut,
    CubicOut,
    CubicIn,
    QuartOut,
    QuartIn,
    CubicInOut,
    QuartInOut,
    QuintOut,
    QuintIn,
    ExpoOut,
    ExpoIn,
    CircOut,
    CircIn,
    BackOut,
    BackIn,
    CircInOut,
    BackInOut,
    ElasticOut,
    ElasticIn,
    BounceOut,
    BounceIn,
    BounceInOut,
    ElasticInOut,
    Bezier { points: [f64; 4] },
    Unmapped { format: ChartFormat, code: i32 },
}

const CODE_TABLE: [Easing; 29] = [
    Easing::Linear,
    Easing::SineOut,
    Easing::SineIn,
    Easing::QuadOut,
    Easing::QuadIn,
    Easing::SineInOut,
    Easing::QuadInOut,
    Easing::CubicOut,
    Easing::CubicIn,
    Easing::QuartOut,
    Easing::QuartIn,
    Easing::CubicInOut,
    Easing::QuartInOut,
    Easing::QuintOut,
    Easing::QuintIn,
    Easing::ExpoOut,
    Easing::ExpoIn,
    Easing::CircOut,
    Easing::CircIn,
    Easing::BackOut,
    Easing::BackIn,
    Easing::CircInOut,
    Easing::BackInOut,
    Easing::ElasticOut,
    Easing::ElasticIn,
    Easing::BounceOut,
    Easing::BounceIn,
    Easing::BounceInOut,
    Easing::ElasticInOut,
];

impl Easing {
    /// Maps a numbered easing code. Codes outside the shared table are kept as
    /// [`Easing::Unmapped`].
    pub fn from_code(format: ChartFormat, code: i32) -> Self {
        usize::try_from(code)
            .ok()
            .and_then(|c| c.checked_sub(1))
            .and_then(|i| CODE_TABLE.get(i).copied())
            .unwrap_or(Easing::Unmapped { format, code })
    }

    /// The shared numbered code, if this is one of the named tweens.
    pub fn code(&self) -> Option<i32> {
        CODE_TABLE
            .iter()
            .position(|e| e == self)
            .map(|i| i as i32 + 1)
    }

    pub fn bezier_points(&self) -> Option<[f64; 4]> {
        match self {
            Easing::Bezier { points } => Some(*points),
            _ => None,
        }
    }
}
