use serde::{Deserialize, Serialize};

mod easing;
mod time;
mod timed;

pub use easing::Easing;
pub use time::{TimeValue, TimeValueError, MAX_DECIMAL_PLACES};
pub use timed::{is_time_ordered, sort_timed, timed_cmp, Timed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartFormat {
    /// Structured JSON document (tempo list, metadata, judge-line array).
    Rpe,
    /// Line-oriented command stream.
    Pec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalChart {
    pub info: ChartInfo,
    pub offset_ms: f64,
    pub bpm_changes: Vec<BpmChange>,
    pub judge_lines: Vec<JudgeLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartInfo {
    pub format: ChartFormat,
    /// Schema version declared by the source document; 0 when absent.
    pub format_version: i32,
    pub name: Option<String>,
    pub level: Option<String>,
    pub charter: Option<String>,
    pub composer: Option<String>,
}

impl ChartInfo {
    pub fn new(format: ChartFormat) -> Self {
        Self {
            format,
            format_version: 0,
            name: None,
            level: None,
            charter: None,
            composer: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BpmChange {
    pub time: TimeValue,
    pub bpm: f64,
}

impl Timed for BpmChange {
    fn start_time(&self) -> TimeValue {
        self.time
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    Tap,
    Drag,
    Hold,
    Flick,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub start_time: TimeValue,
    /// Present only for holds.
    pub end_time: Option<TimeValue>,
    pub position_x: f64,
    pub kind: NoteKind,
    pub above: bool,
    pub is_fake: bool,
    pub speed: f64,
    pub size: f64,
    pub y_offset: f64,
    pub visible_time: f64,
    pub alpha: u8,
}

impl Note {
    pub fn new(kind: NoteKind, start_time: TimeValue, position_x: f64) -> Self {
        Self {
            start_time,
            end_time: None,
            position_x,
            kind,
            above: true,
            is_fake: false,
            speed: 1.0,
            size: 1.0,
            y_offset: 0.0,
            visible_time: 999_999.0,
            alpha: 255,
        }
    }
}

impl Timed for Note {
    fn start_time(&self) -> TimeValue {
        self.start_time
    }

    fn end_time(&self) -> TimeValue {
        self.end_time.unwrap_or(self.start_time)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventValue {
    Scalar { start: f64, end: f64 },
    Vector { start: [f64; 2], end: [f64; 2] },
    Color { start: [u8; 3], end: [u8; 3] },
    Text { start: String, end: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    pub start_time: TimeValue,
    pub end_time: TimeValue,
    pub value: EventValue,
    pub easing: Easing,
    /// Portion of the easing curve that is played, `[0, 1]` for the full curve.
    pub easing_range: [f64; 2],
    pub link_group: i32,
}

impl CanonicalEvent {
    pub fn new(start_time: TimeValue, end_time: TimeValue, value: EventValue) -> Self {
        Self {
            start_time,
            end_time,
            value,
            easing: Easing::Linear,
            easing_range: [0.0, 1.0],
            link_group: 0,
        }
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn bezier_control_points(&self) -> Option<[f64; 4]> {
        self.easing.bezier_points()
    }
}

impl Timed for CanonicalEvent {
    fn start_time(&self) -> TimeValue {
        self.start_time
    }

    fn end_time(&self) -> TimeValue {
        self.end_time
    }
}

/// Every animatable judge-line property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    Alpha,
    MoveX,
    MoveY,
    /// Combined x/y motion carried as [`EventValue::Vector`].
    Position,
    Rotate,
    Speed,
    ScaleX,
    ScaleY,
    Incline,
    Paint,
    Text,
    Color,
}

impl Property {
    pub const LAYER: [Property; 6] = [
        Property::Alpha,
        Property::MoveX,
        Property::MoveY,
        Property::Position,
        Property::Rotate,
        Property::Speed,
    ];

    pub const EXTENDED: [Property; 6] = [
        Property::ScaleX,
        Property::ScaleY,
        Property::Incline,
        Property::Paint,
        Property::Text,
        Property::Color,
    ];

    pub fn is_extended(self) -> bool {
        Self::EXTENDED.contains(&self)
    }
}

/// One stackable layer of base motion tracks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLayer {
    pub alpha: Vec<CanonicalEvent>,
    pub move_x: Vec<CanonicalEvent>,
    pub move_y: Vec<CanonicalEvent>,
    pub position: Vec<CanonicalEvent>,
    pub rotate: Vec<CanonicalEvent>,
    pub speed: Vec<CanonicalEvent>,
}

impl EventLayer {
    pub fn track(&self, property: Property) -> Option<&Vec<CanonicalEvent>> {
        match property {
            Property::Alpha => Some(&self.alpha),
            Property::MoveX => Some(&self.move_x),
            Property::MoveY => Some(&self.move_y),
            Property::Position => Some(&self.position),
            Property::Rotate => Some(&self.rotate),
            Property::Speed => Some(&self.speed),
            _ => None,
        }
    }

    pub fn track_mut(&mut self, property: Property) -> Option<&mut Vec<CanonicalEvent>> {
        match property {
            Property::Alpha => Some(&mut self.alpha),
            Property::MoveX => Some(&mut self.move_x),
            Property::MoveY => Some(&mut self.move_y),
            Property::Position => Some(&mut self.position),
            Property::Rotate => Some(&mut self.rotate),
            Property::Speed => Some(&mut self.speed),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        Property::LAYER
            .iter()
            .filter_map(|p| self.track(*p))
            .all(|t| t.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtendedTracks {
    pub scale_x: Vec<CanonicalEvent>,
    pub scale_y: Vec<CanonicalEvent>,
    pub incline: Vec<CanonicalEvent>,
    pub paint: Vec<CanonicalEvent>,
    pub text: Vec<CanonicalEvent>,
    pub color: Vec<CanonicalEvent>,
}

impl ExtendedTracks {
    pub fn track(&self, property: Property) -> Option<&Vec<CanonicalEvent>> {
        match property {
            Property::ScaleX => Some(&self.scale_x),
            Property::ScaleY => Some(&self.scale_y),
            Property::Incline => Some(&self.incline),
            Property::Paint => Some(&self.paint),
            Property::Text => Some(&self.text),
            Property::Color => Some(&self.color),
            _ => None,
        }
    }

    pub fn track_mut(&mut self, property: Property) -> Option<&mut Vec<CanonicalEvent>> {
        match property {
            Property::ScaleX => Some(&mut self.scale_x),
            Property::ScaleY => Some(&mut self.scale_y),
            Property::Incline => Some(&mut self.incline),
            Property::Paint => Some(&mut self.paint),
            Property::Text => Some(&mut self.text),
            Property::Color => Some(&mut self.color),
            _ => None,
        }
    }
}

/// A point on a position-dependent control curve (alpha/pos/size/skew/y).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub x: f64,
    pub easing: Easing,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlTracks {
    pub alpha: Vec<ControlPoint>,
    pub position: Vec<ControlPoint>,
    pub size: Vec<ControlPoint>,
    pub skew: Vec<ControlPoint>,
    pub y: Vec<ControlPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JudgeLine {
    pub name: String,
    pub texture: Option<String>,
    pub parent: Option<usize>,
    pub z_order: i32,
    pub notes: Vec<Note>,
    pub layers: Vec<EventLayer>,
    pub extended: ExtendedTracks,
    pub controls: ControlTracks,
}

impl JudgeLine {
    /// The tracks animating `property`, one per layer for base properties.
    pub fn tracks(&self, property: Property) -> Vec<&[CanonicalEvent]> {
        if property.is_extended() {
            self.extended
                .track(property)
                .map(|t| vec![t.as_slice()])
                .unwrap_or_default()
        } else {
            self.layers
                .iter()
                .filter_map(|l| l.track(property))
                .map(|t| t.as_slice())
                .collect()
        }
    }

    /// Puts notes and every track into `(start, end)` order.
    pub fn sort_timeline(&mut self) {
        sort_timed(&mut self.notes);
        for layer in &mut self.layers {
            for property in Property::LAYER {
                if let Some(track) = layer.track_mut(property) {
                    sort_timed(track);
                }
            }
        }
        for property in Property::EXTENDED {
            if let Some(track) = self.extended.track_mut(property) {
                sort_timed(track);
            }
        }
    }

    pub fn is_time_ordered(&self) -> bool {
        is_time_ordered(&self.notes)
            && Property::LAYER
                .iter()
                .chain(Property::EXTENDED.iter())
                .all(|p| self.tracks(*p).iter().all(|t| is_time_ordered(*t)))
    }

    pub fn real_note_count(&self) -> usize {
        self.notes.iter().filter(|n| !n.is_fake).count()
    }
}

impl CanonicalChart {
    /// Non-fake notes across all judge lines.
    pub fn note_count(&self) -> usize {
        self.judge_lines.iter().map(JudgeLine::real_note_count).sum()
    }

    pub fn is_time_ordered(&self) -> bool {
        is_time_ordered(&self.bpm_changes) && self.judge_lines.iter().all(JudgeLine::is_time_ordered)
    }

    /// Latest end time over every note and event, or zero for an empty chart.
    pub fn total_duration(&self) -> TimeValue {
        let mut latest = TimeValue::ZERO;
        for line in &self.judge_lines {
            let note_ends = line.notes.iter().map(Timed::end_time);
            let event_ends = Property::LAYER
                .iter()
                .chain(Property::EXTENDED.iter())
                .flat_map(|p| line.tracks(*p))
                .flat_map(|t| t.iter().map(Timed::end_time));
            for end in note_ends.chain(event_ends) {
                if end > latest {
                    latest = end;
                }
            }
        }
        latest
    }
}
