use std::{fs, path::Path};

use chart_schema::{CanonicalChart, ChartFormat};
use tracing::{debug, info};

mod error;
mod pec;
mod rpe;

pub use error::{ChartError, ChartErrorKind};

#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Forces a format instead of detecting it.
    pub format: Option<ChartFormat>,
}

/// Parses one chart. Identical bytes always give an identical chart.
pub fn parse_chart(src: &[u8], format: ChartFormat) -> Result<CanonicalChart, ChartError> {
    debug!(?format, bytes = src.len(), "parsing chart");
    match format {
        ChartFormat::Rpe => rpe::parse_rpe(src),
        ChartFormat::Pec => {
            let text = std::str::from_utf8(src).map_err(|e| {
                ChartError::new("E1001", format!("command stream is not valid UTF-8: {e}"), 0)
            })?;
            pec::parse_pec(text.trim_start_matches('\u{feff}'))
        }
    }
}

pub fn parse_chart_auto(src: &[u8]) -> Result<CanonicalChart, ChartError> {
    parse_chart(src, detect_format(src))
}

pub fn parse_str(src: &str) -> Result<CanonicalChart, ChartError> {
    parse_chart_auto(src.as_bytes())
}

pub fn parse_file(path: impl AsRef<Path>) -> Result<CanonicalChart, ChartError> {
    parse_file_with_options(path, ParseOptions::default())
}

pub fn parse_file_with_options(
    path: impl AsRef<Path>,
    options: ParseOptions,
) -> Result<CanonicalChart, ChartError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| {
        ChartError::new("E2001", format!("failed to read chart file: {e}"), 0)
            .with_file(path.display().to_string())
    })?;

    let format = options
        .format
        .or_else(|| format_from_extension(path))
        .unwrap_or_else(|| detect_format(&bytes));

    let chart = parse_chart(&bytes, format)
        .map_err(|e| e.with_file(path.display().to_string()))?;
    info!(
        path = %path.display(),
        ?format,
        notes = chart.note_count(),
        "chart parsed"
    );
    Ok(chart)
}

/// A document whose first non-blank byte opens a JSON object is the
/// structured format; anything else is read as a command stream.
pub fn detect_format(src: &[u8]) -> ChartFormat {
    let src = src.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(src);
    match src.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') => ChartFormat::Rpe,
        _ => ChartFormat::Pec,
    }
}

pub fn format_from_extension(path: &Path) -> Option<ChartFormat> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "json" => Some(ChartFormat::Rpe),
        "pec" => Some(ChartFormat::Pec),
        _ => None,
    }
}
