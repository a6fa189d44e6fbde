//! Structured JSON chart documents.
//!
//! The document shape changed over editor releases (booleans vs. 0/1 flags,
//! optional bezier fields, missing version tags). All of them deserialize into
//! the single DTO tree below; `META.RPEVersion` records which release wrote it.

use chart_schema::{
    BpmChange, CanonicalChart, CanonicalEvent, ChartFormat, ChartInfo, ControlPoint,
    ControlTracks, Easing, EventLayer, EventValue, ExtendedTracks, JudgeLine, Note, NoteKind,
    TimeValue,
};
use serde::Deserialize;
use serde_json::error::Category;
use tracing::{debug, warn};

use crate::ChartError;

type RawTime = [i32; 3];

#[derive(Debug, Deserialize)]
struct RpeDocument {
    #[serde(rename = "BPMList")]
    bpm_list: Vec<RpeBpm>,
    #[serde(rename = "META")]
    meta: RpeMeta,
    #[serde(rename = "judgeLineList", alias = "judgelineList", alias = "judgelinelist")]
    judge_line_list: Vec<RpeJudgeLine>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpeBpm {
    bpm: f64,
    start_time: RawTime,
}

#[derive(Debug, Deserialize)]
struct RpeMeta {
    #[serde(rename = "RPEVersion", default)]
    rpe_version: i32,
    offset: f64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    charter: Option<String>,
    #[serde(default)]
    composer: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpeJudgeLine {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Texture", default)]
    texture: Option<String>,
    #[serde(default = "no_father")]
    father: i64,
    #[serde(default)]
    z_order: i32,
    #[serde(rename = "bpmfactor", default = "one")]
    bpm_factor: f64,
    #[serde(default, deserialize_with = "null_as_empty")]
    notes: Vec<RpeNote>,
    #[serde(default, deserialize_with = "null_as_empty")]
    event_layers: Vec<Option<RpeEventLayer>>,
    #[serde(default)]
    extended: Option<RpeExtended>,
    #[serde(default, deserialize_with = "null_as_empty")]
    alpha_control: Vec<RpeControl>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pos_control: Vec<RpeControl>,
    #[serde(default, deserialize_with = "null_as_empty")]
    size_control: Vec<RpeControl>,
    #[serde(default, deserialize_with = "null_as_empty")]
    skew_control: Vec<RpeControl>,
    #[serde(default, deserialize_with = "null_as_empty")]
    y_control: Vec<RpeControl>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpeEventLayer {
    #[serde(default, deserialize_with = "null_as_empty")]
    alpha_events: Vec<RpeEvent>,
    #[serde(default, deserialize_with = "null_as_empty")]
    move_x_events: Vec<RpeEvent>,
    #[serde(default, deserialize_with = "null_as_empty")]
    move_y_events: Vec<RpeEvent>,
    #[serde(default, deserialize_with = "null_as_empty")]
    rotate_events: Vec<RpeEvent>,
    #[serde(default, deserialize_with = "null_as_empty")]
    speed_events: Vec<RpeEvent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpeExtended {
    #[serde(default, deserialize_with = "null_as_empty")]
    scale_x_events: Vec<RpeEvent>,
    #[serde(default, deserialize_with = "null_as_empty")]
    scale_y_events: Vec<RpeEvent>,
    #[serde(default, deserialize_with = "null_as_empty")]
    incline_events: Vec<RpeEvent>,
    #[serde(default, deserialize_with = "null_as_empty")]
    paint_events: Vec<RpeEvent>,
    #[serde(default, deserialize_with = "null_as_empty")]
    text_events: Vec<RpeEvent>,
    #[serde(default, deserialize_with = "null_as_empty")]
    color_events: Vec<RpeEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpeEvent {
    start_time: RawTime,
    end_time: RawTime,
    start: RpeValue,
    end: RpeValue,
    #[serde(default = "linear_code")]
    easing_type: i32,
    #[serde(default)]
    bezier: Flag,
    #[serde(default, deserialize_with = "null_as_empty")]
    bezier_points: Vec<f64>,
    #[serde(default)]
    easing_left: f64,
    #[serde(default = "one")]
    easing_right: f64,
    #[serde(rename = "linkgroup", default)]
    link_group: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RpeValue {
    Number(f64),
    Color([u8; 3]),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpeNote {
    #[serde(rename = "type")]
    kind: i32,
    start_time: RawTime,
    #[serde(default)]
    end_time: Option<RawTime>,
    position_x: f64,
    #[serde(default = "above_code")]
    above: i32,
    #[serde(default)]
    is_fake: Flag,
    #[serde(default = "one")]
    speed: f64,
    #[serde(default = "one")]
    size: f64,
    #[serde(default)]
    y_offset: f64,
    #[serde(default = "visible_forever")]
    visible_time: f64,
    #[serde(default = "opaque")]
    alpha: f64,
}

#[derive(Debug, Deserialize)]
struct RpeControl {
    x: f64,
    #[serde(default = "linear_code")]
    easing: i32,
    #[serde(alias = "alpha", alias = "pos", alias = "size", alias = "skew", alias = "y")]
    value: f64,
}

/// Older exports write `null` where newer ones omit the array.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// `0`/`1` in current documents, `false`/`true` in older ones.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

impl Default for Flag {
    fn default() -> Self {
        Flag::Int(0)
    }
}

fn no_father() -> i64 {
    -1
}

fn linear_code() -> i32 {
    1
}

fn one() -> f64 {
    1.0
}

fn above_code() -> i32 {
    1
}

fn visible_forever() -> f64 {
    999_999.0
}

fn opaque() -> f64 {
    255.0
}

#[derive(Debug, Clone, Copy)]
enum ValueShape {
    Scalar,
    Color,
    Text,
}

pub(crate) fn parse_rpe(src: &[u8]) -> Result<CanonicalChart, ChartError> {
    let src = src.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(src);
    let doc: RpeDocument = serde_json::from_slice(src).map_err(classify_json_error)?;
    if doc.bpm_list.is_empty() {
        return Err(ChartError::new("E1002", "BPMList must not be empty", 0));
    }

    let mut bpm_changes = Vec::with_capacity(doc.bpm_list.len());
    for bpm in &doc.bpm_list {
        if !(bpm.bpm > 0.0) {
            return Err(ChartError::new(
                "E1003",
                format!("bpm must be > 0 (bpm={})", bpm.bpm),
                0,
            ));
        }
        bpm_changes.push(BpmChange {
            time: time(bpm.start_time, None)?,
            bpm: bpm.bpm,
        });
    }
    chart_schema::sort_timed(&mut bpm_changes);

    let line_count = doc.judge_line_list.len();
    let mut judge_lines = Vec::with_capacity(line_count);
    for (idx, raw) in doc.judge_line_list.into_iter().enumerate() {
        let line = convert_line(idx, raw, line_count)?;
        judge_lines.push(line);
    }

    let chart = CanonicalChart {
        info: ChartInfo {
            format: ChartFormat::Rpe,
            format_version: doc.meta.rpe_version,
            name: doc.meta.name,
            level: doc.meta.level,
            charter: doc.meta.charter,
            composer: doc.meta.composer,
        },
        offset_ms: doc.meta.offset,
        bpm_changes,
        judge_lines,
    };
    debug!(
        version = chart.info.format_version,
        judge_lines = chart.judge_lines.len(),
        notes = chart.note_count(),
        "parsed json chart"
    );
    Ok(chart)
}

fn classify_json_error(e: serde_json::Error) -> ChartError {
    let code = match e.classify() {
        Category::Data if e.to_string().starts_with("missing field") => "E1002",
        Category::Data => "E1003",
        Category::Syntax | Category::Eof | Category::Io => "E1001",
    };
    ChartError::new(code, format!("invalid chart document: {e}"), e.line()).with_column(e.column())
}

fn time(raw: RawTime, judge_line: Option<usize>) -> Result<TimeValue, ChartError> {
    TimeValue::try_from(raw).map_err(|e| {
        let err = ChartError::new("E3001", e.to_string(), 0);
        match judge_line {
            Some(idx) => err.with_judge_line(idx),
            None => err,
        }
    })
}

fn convert_line(idx: usize, raw: RpeJudgeLine, line_count: usize) -> Result<JudgeLine, ChartError> {
    let parent = match raw.father {
        f if f < 0 => None,
        f => {
            let f = f as usize;
            if f >= line_count || f == idx {
                return Err(ChartError::new(
                    "E1003",
                    format!("invalid father index {f} on judge line {idx}"),
                    0,
                )
                .with_judge_line(idx));
            }
            Some(f)
        }
    };

    if raw.bpm_factor != 1.0 {
        warn!(judge_line = idx, bpm_factor = raw.bpm_factor, "ignoring per-line bpmfactor");
    }

    let mut notes = Vec::with_capacity(raw.notes.len());
    for note in &raw.notes {
        notes.push(convert_note(idx, note)?);
    }

    let mut layers = Vec::with_capacity(raw.event_layers.len());
    for (layer_idx, layer) in raw.event_layers.into_iter().enumerate() {
        let Some(layer) = layer else {
            warn!(judge_line = idx, layer = layer_idx, "skipping null event layer");
            continue;
        };
        layers.push(EventLayer {
            alpha: events(idx, &layer.alpha_events, ValueShape::Scalar)?,
            move_x: events(idx, &layer.move_x_events, ValueShape::Scalar)?,
            move_y: events(idx, &layer.move_y_events, ValueShape::Scalar)?,
            position: Vec::new(),
            rotate: events(idx, &layer.rotate_events, ValueShape::Scalar)?,
            speed: events(idx, &layer.speed_events, ValueShape::Scalar)?,
        });
    }

    let ext = raw.extended.unwrap_or_default();
    let extended = ExtendedTracks {
        scale_x: events(idx, &ext.scale_x_events, ValueShape::Scalar)?,
        scale_y: events(idx, &ext.scale_y_events, ValueShape::Scalar)?,
        incline: events(idx, &ext.incline_events, ValueShape::Scalar)?,
        paint: events(idx, &ext.paint_events, ValueShape::Scalar)?,
        text: events(idx, &ext.text_events, ValueShape::Text)?,
        color: events(idx, &ext.color_events, ValueShape::Color)?,
    };

    let controls = ControlTracks {
        alpha: controls(&raw.alpha_control),
        position: controls(&raw.pos_control),
        size: controls(&raw.size_control),
        skew: controls(&raw.skew_control),
        y: controls(&raw.y_control),
    };

    let mut line = JudgeLine {
        name: raw.name,
        texture: raw.texture,
        parent,
        z_order: raw.z_order,
        notes,
        layers,
        extended,
        controls,
    };
    line.sort_timeline();
    Ok(line)
}

fn convert_note(idx: usize, raw: &RpeNote) -> Result<Note, ChartError> {
    let kind = match raw.kind {
        1 => NoteKind::Tap,
        2 => NoteKind::Hold,
        3 => NoteKind::Flick,
        4 => NoteKind::Drag,
        other => {
            return Err(ChartError::new(
                "E1003",
                format!("unknown note type {other} on judge line {idx}"),
                0,
            )
            .with_judge_line(idx));
        }
    };
    let start_time = time(raw.start_time, Some(idx))?;

    let end_time = if kind == NoteKind::Hold {
        let raw_end = raw.end_time.ok_or_else(|| {
            ChartError::new(
                "E1002",
                format!("hold note without endTime on judge line {idx}"),
                0,
            )
            .with_judge_line(idx)
        })?;
        let end = time(raw_end, Some(idx))?;
        if end < start_time {
            return Err(ChartError::new(
                "E3003",
                format!("hold ends before it starts ({start_time} > {end}) on judge line {idx}"),
                0,
            )
            .with_judge_line(idx));
        }
        Some(end)
    } else {
        None
    };

    Ok(Note {
        start_time,
        end_time,
        position_x: raw.position_x,
        kind,
        above: raw.above == 1,
        is_fake: raw.is_fake.is_set(),
        speed: raw.speed,
        size: raw.size,
        y_offset: raw.y_offset,
        visible_time: raw.visible_time,
        alpha: raw.alpha.clamp(0.0, 255.0) as u8,
    })
}

fn events(idx: usize, raw: &[RpeEvent], shape: ValueShape) -> Result<Vec<CanonicalEvent>, ChartError> {
    raw.iter().map(|e| convert_event(idx, e, shape)).collect()
}

fn convert_event(idx: usize, raw: &RpeEvent, shape: ValueShape) -> Result<CanonicalEvent, ChartError> {
    let value = match (shape, &raw.start, &raw.end) {
        (ValueShape::Scalar, RpeValue::Number(s), RpeValue::Number(e)) => EventValue::Scalar {
            start: *s,
            end: *e,
        },
        (ValueShape::Color, RpeValue::Color(s), RpeValue::Color(e)) => EventValue::Color {
            start: *s,
            end: *e,
        },
        (ValueShape::Text, RpeValue::Text(s), RpeValue::Text(e)) => EventValue::Text {
            start: s.clone(),
            end: e.clone(),
        },
        (shape, start, end) => {
            return Err(ChartError::new(
                "E1003",
                format!("event value does not match a {shape:?} track (start={start:?}, end={end:?})"),
                0,
            )
            .with_judge_line(idx));
        }
    };

    let easing = if raw.bezier.is_set() {
        let points: [f64; 4] = raw.bezier_points.as_slice().try_into().map_err(|_| {
            ChartError::new(
                "E1003",
                format!(
                    "bezier event needs 4 bezierPoints, got {}",
                    raw.bezier_points.len()
                ),
                0,
            )
            .with_judge_line(idx)
        })?;
        Easing::Bezier { points }
    } else {
        Easing::from_code(ChartFormat::Rpe, raw.easing_type)
    };

    Ok(CanonicalEvent {
        start_time: time(raw.start_time, Some(idx))?,
        end_time: time(raw.end_time, Some(idx))?,
        value,
        easing,
        easing_range: [raw.easing_left, raw.easing_right],
        link_group: raw.link_group,
    })
}

fn controls(raw: &[RpeControl]) -> Vec<ControlPoint> {
    raw.iter()
        .map(|c| ControlPoint {
            x: c.x,
            easing: Easing::from_code(ChartFormat::Rpe, c.easing),
            value: c.value,
        })
        .collect()
}
