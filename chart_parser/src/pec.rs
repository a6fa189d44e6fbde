//! Line-oriented command stream charts.
//!
//! The first non-empty line holds the offset in milliseconds. Every other line
//! is a two-letter command followed by whitespace separated fields:
//!
//! ```text
//! bp <beat> <bpm>
//! n1|n3|n4 <line> <beat> <x> <above> <fake>        tap / flick / drag
//! n2 <line> <beat> <end> <x> <above> <fake>        hold
//! # <speed>                                        speed of the previous note
//! & <size>                                         size of the previous note
//! cv <line> <beat> <speed>
//! cp <line> <beat> <x> <y>
//! cd <line> <beat> <degrees>
//! ca <line> <beat> <alpha>
//! cm <line> <beat> <end> <x> <y> <easing>
//! cr <line> <beat> <end> <degrees> <easing>
//! cf <line> <beat> <end> <alpha>
//! ```

use chart_schema::{
    sort_timed, BpmChange, CanonicalChart, CanonicalEvent, ChartFormat, ChartInfo, Easing,
    EventLayer, EventValue, JudgeLine, Note, NoteKind, TimeValue, Timed,
};
use tracing::debug;

use crate::ChartError;

pub(crate) const CANVAS_WIDTH: f64 = 2048.0;
pub(crate) const CANVAS_HEIGHT: f64 = 1400.0;
pub(crate) const NOTE_X_RANGE: f64 = 1024.0;

const WORLD_WIDTH: f64 = 1350.0;
const WORLD_HEIGHT: f64 = 900.0;

/// Judge-line ids at or above this are rejected.
pub(crate) const MAX_JUDGE_LINES: usize = 4096;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LineOp {
    Speed(f64),
    Move { x: f64, y: f64, easing: Easing },
    Rotate { degrees: f64, easing: Easing },
    Fade { alpha: f64 },
}

/// One judge-line command, already resolved to canonical times and units.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LineCommand {
    pub(crate) judge_line: usize,
    pub(crate) start: TimeValue,
    pub(crate) end: TimeValue,
    pub(crate) op: LineOp,
}

impl Timed for LineCommand {
    fn start_time(&self) -> TimeValue {
        self.start
    }

    fn end_time(&self) -> TimeValue {
        self.end
    }
}

#[derive(Debug, Default)]
pub(crate) struct ParsedPec {
    pub(crate) offset_ms: f64,
    pub(crate) bpm_changes: Vec<BpmChange>,
    pub(crate) notes: Vec<(usize, Note)>,
    pub(crate) commands: Vec<LineCommand>,
}

pub(crate) fn parse_pec(src: &str) -> Result<CanonicalChart, ChartError> {
    let parsed = parse_commands(src)?;
    build_chart(parsed)
}

pub(crate) fn parse_commands(src: &str) -> Result<ParsedPec, ChartError> {
    let mut parsed = ParsedPec::default();
    let mut offset_seen = false;
    // Index into `parsed.notes` that `#` / `&` lines modify.
    let mut last_note: Option<usize> = None;

    for (i, raw_line) in src.lines().enumerate() {
        let line_no = i + 1;
        let trimmed = raw_line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if !offset_seen {
            parsed.offset_ms = trimmed.parse().map_err(|_| {
                ChartError::new("E1105", "first line must be the offset in ms", line_no)
                    .with_context(trimmed.to_string())
            })?;
            offset_seen = true;
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let (head, args) = (fields[0], &fields[1..]);
        match head {
            "bp" => {
                expect_fields(args, 2, trimmed, line_no)?;
                let bpm = number(args[1], trimmed, line_no)?;
                if !(bpm > 0.0) {
                    return Err(
                        ChartError::new("E1103", format!("bpm must be > 0 (bpm={bpm})"), line_no)
                            .with_context(trimmed.to_string()),
                    );
                }
                parsed.bpm_changes.push(BpmChange {
                    time: beat(args[0], trimmed, line_no)?,
                    bpm,
                });
                last_note = None;
            }
            "n1" | "n2" | "n3" | "n4" => {
                let note = parse_note(head, args, trimmed, line_no)?;
                parsed.notes.push(note);
                last_note = Some(parsed.notes.len() - 1);
            }
            "#" | "&" => {
                expect_fields(args, 1, trimmed, line_no)?;
                let value = number(args[0], trimmed, line_no)?;
                let Some(idx) = last_note else {
                    return Err(ChartError::new(
                        "E1104",
                        format!("'{head}' must follow a note command"),
                        line_no,
                    )
                    .with_context(trimmed.to_string()));
                };
                let note = &mut parsed.notes[idx].1;
                if head == "#" {
                    note.speed = value;
                } else {
                    note.size = value;
                }
            }
            "cv" | "cp" | "cd" | "ca" | "cm" | "cr" | "cf" => {
                parsed
                    .commands
                    .push(parse_line_command(head, args, trimmed, line_no)?);
                last_note = None;
            }
            _ => {
                return Err(ChartError::new(
                    "E1101",
                    format!("unknown command: {head}"),
                    line_no,
                )
                .with_context(trimmed.to_string()));
            }
        }
    }

    if !offset_seen {
        return Err(ChartError::new("E1105", "missing offset line", 0));
    }
    if parsed.bpm_changes.is_empty() {
        return Err(ChartError::new("E1002", "chart has no bp command", 0));
    }
    Ok(parsed)
}

fn parse_note(
    head: &str,
    args: &[&str],
    context_line: &str,
    line_no: usize,
) -> Result<(usize, Note), ChartError> {
    let is_hold = head == "n2";
    expect_fields(args, if is_hold { 6 } else { 5 }, context_line, line_no)?;

    let judge_line = line_index(args[0], context_line, line_no)?;
    let start = beat(args[1], context_line, line_no)?;
    let rest = if is_hold { &args[3..] } else { &args[2..] };

    let kind = match head {
        "n1" => NoteKind::Tap,
        "n2" => NoteKind::Hold,
        "n3" => NoteKind::Flick,
        _ => NoteKind::Drag,
    };
    let x = number(rest[0], context_line, line_no)?;
    let mut note = Note::new(kind, start, x / NOTE_X_RANGE * (WORLD_WIDTH / 2.0));
    note.above = flag(rest[1], context_line, line_no)?;
    note.is_fake = flag(rest[2], context_line, line_no)?;

    if is_hold {
        let end = beat(args[2], context_line, line_no)?;
        if end < start {
            return Err(ChartError::new(
                "E3003",
                format!("hold ends before it starts ({start} > {end})"),
                line_no,
            )
            .with_judge_line(judge_line)
            .with_context(context_line.to_string()));
        }
        note.end_time = Some(end);
    }
    Ok((judge_line, note))
}

fn parse_line_command(
    head: &str,
    args: &[&str],
    context_line: &str,
    line_no: usize,
) -> Result<LineCommand, ChartError> {
    let expected = match head {
        "cv" | "cd" | "ca" => 3,
        "cp" | "cf" => 4,
        "cr" => 5,
        _ => 6, // cm
    };
    expect_fields(args, expected, context_line, line_no)?;

    let judge_line = line_index(args[0], context_line, line_no)?;
    let start = beat(args[1], context_line, line_no)?;
    let num = |i: usize| number(args[i], context_line, line_no);
    let easing = |i: usize| -> Result<Easing, ChartError> {
        let tok = args[i];
        let code = tok.parse::<i32>().map_err(|_| {
            ChartError::new(
                "E1103",
                format!("invalid easing code: {tok} (context={context_line})"),
                line_no,
            )
            .with_context(context_line.to_string())
        })?;
        Ok(Easing::from_code(ChartFormat::Pec, code))
    };

    let (end, op) = match head {
        "cv" => (start, LineOp::Speed(num(2)?)),
        "cp" => (
            start,
            LineOp::Move {
                x: canvas_x(num(2)?),
                y: canvas_y(num(3)?),
                easing: Easing::Linear,
            },
        ),
        "cd" => (
            start,
            LineOp::Rotate {
                degrees: num(2)?,
                easing: Easing::Linear,
            },
        ),
        "ca" => (start, LineOp::Fade { alpha: num(2)? }),
        "cm" => (
            beat(args[2], context_line, line_no)?,
            LineOp::Move {
                x: canvas_x(num(3)?),
                y: canvas_y(num(4)?),
                easing: easing(5)?,
            },
        ),
        "cr" => (
            beat(args[2], context_line, line_no)?,
            LineOp::Rotate {
                degrees: num(3)?,
                easing: easing(4)?,
            },
        ),
        _ => (
            beat(args[2], context_line, line_no)?,
            LineOp::Fade { alpha: num(3)? },
        ),
    };

    Ok(LineCommand {
        judge_line,
        start,
        end,
        op,
    })
}

/// Last value seen for each property of one judge line.
#[derive(Debug, Clone, Copy)]
struct LineState {
    position: [f64; 2],
    degrees: f64,
    alpha: f64,
}

impl Default for LineState {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0],
            degrees: 0.0,
            alpha: 0.0,
        }
    }
}

fn build_chart(mut parsed: ParsedPec) -> Result<CanonicalChart, ChartError> {
    sort_timed(&mut parsed.bpm_changes);
    sort_timed(&mut parsed.commands);

    let line_count = parsed
        .notes
        .iter()
        .map(|(l, _)| *l)
        .chain(parsed.commands.iter().map(|c| c.judge_line))
        .max()
        .map_or(Some(0), |max| max.checked_add(1))
        .ok_or_else(|| ChartError::new("E1103", "judge line index out of range", 0))?;

    let mut judge_lines: Vec<JudgeLine> = (0..line_count)
        .map(|idx| JudgeLine {
            name: idx.to_string(),
            layers: vec![EventLayer::default()],
            ..JudgeLine::default()
        })
        .collect();
    let mut states = vec![LineState::default(); line_count];

    for (idx, note) in parsed.notes {
        judge_lines[idx].notes.push(note);
    }

    for cmd in parsed.commands {
        let state = &mut states[cmd.judge_line];
        let layer = &mut judge_lines[cmd.judge_line].layers[0];
        match cmd.op {
            LineOp::Speed(v) => layer.speed.push(CanonicalEvent::new(
                cmd.start,
                cmd.end,
                EventValue::Scalar { start: v, end: v },
            )),
            LineOp::Move { x, y, easing } => {
                let from = state.position;
                state.position = [x, y];
                layer.position.push(
                    CanonicalEvent::new(
                        cmd.start,
                        cmd.end,
                        EventValue::Vector {
                            start: if cmd.start == cmd.end { [x, y] } else { from },
                            end: [x, y],
                        },
                    )
                    .with_easing(easing),
                );
            }
            LineOp::Rotate { degrees, easing } => {
                let from = state.degrees;
                state.degrees = degrees;
                layer.rotate.push(
                    CanonicalEvent::new(
                        cmd.start,
                        cmd.end,
                        EventValue::Scalar {
                            start: if cmd.start == cmd.end { degrees } else { from },
                            end: degrees,
                        },
                    )
                    .with_easing(easing),
                );
            }
            LineOp::Fade { alpha } => {
                let from = state.alpha;
                state.alpha = alpha;
                layer.alpha.push(CanonicalEvent::new(
                    cmd.start,
                    cmd.end,
                    EventValue::Scalar {
                        start: if cmd.start == cmd.end { alpha } else { from },
                        end: alpha,
                    },
                ));
            }
        }
    }

    for line in &mut judge_lines {
        line.sort_timeline();
    }

    let chart = CanonicalChart {
        info: ChartInfo::new(ChartFormat::Pec),
        offset_ms: parsed.offset_ms,
        bpm_changes: parsed.bpm_changes,
        judge_lines,
    };
    debug!(
        judge_lines = chart.judge_lines.len(),
        notes = chart.note_count(),
        "parsed command stream chart"
    );
    Ok(chart)
}

fn canvas_x(x: f64) -> f64 {
    (x / CANVAS_WIDTH - 0.5) * WORLD_WIDTH
}

fn canvas_y(y: f64) -> f64 {
    (y / CANVAS_HEIGHT - 0.5) * WORLD_HEIGHT
}

fn expect_fields(
    args: &[&str],
    expected: usize,
    context_line: &str,
    line_no: usize,
) -> Result<(), ChartError> {
    if args.len() != expected {
        return Err(ChartError::new(
            "E1102",
            format!(
                "expected {expected} fields, got {} (context={context_line})",
                args.len()
            ),
            line_no,
        )
        .with_context(context_line.to_string()));
    }
    Ok(())
}

fn number(tok: &str, context_line: &str, line_no: usize) -> Result<f64, ChartError> {
    tok.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            ChartError::new(
                "E1103",
                format!("invalid number: {tok} (context={context_line})"),
                line_no,
            )
            .with_context(context_line.to_string())
        })
}

fn line_index(tok: &str, context_line: &str, line_no: usize) -> Result<usize, ChartError> {
    match tok.parse::<usize>() {
        Ok(idx) if idx < MAX_JUDGE_LINES => Ok(idx),
        _ => Err(ChartError::new(
            "E1103",
            format!(
                "invalid judge line index: {tok} (expected 0..{MAX_JUDGE_LINES}, context={context_line})"
            ),
            line_no,
        )
        .with_context(context_line.to_string())),
    }
}

fn flag(tok: &str, context_line: &str, line_no: usize) -> Result<bool, ChartError> {
    match tok {
        "1" => Ok(true),
        "0" => Ok(false),
        _ => Err(ChartError::new(
            "E1103",
            format!("expected 0 or 1, got {tok} (context={context_line})"),
            line_no,
        )
        .with_context(context_line.to_string())),
    }
}

fn beat(tok: &str, context_line: &str, line_no: usize) -> Result<TimeValue, ChartError> {
    TimeValue::from_beats_decimal(tok).map_err(|e| {
        ChartError::new("E3002", format!("{e} (context={context_line})"), line_no)
            .with_context(context_line.to_string())
    })
}
