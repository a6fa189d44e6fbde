use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartErrorKind {
    Syntax,
    MissingField,
    InvalidValue,
    InvalidTime,
    UnknownCommand,
    IO,
}

impl ChartErrorKind {
    pub(crate) fn from_code(code: &'static str) -> Self {
        match code {
            // Document / stream syntax
            "E1001" | "E1102" | "E1103" | "E1104" | "E1105" => Self::Syntax,

            "E1002" => Self::MissingField,
            "E1003" => Self::InvalidValue,
            "E1101" => Self::UnknownCommand,

            // Time triples and beat literals
            "E3001" | "E3002" | "E3003" => Self::InvalidTime,

            // IO
            "E2001" => Self::IO,

            _ => Self::Syntax,
        }
    }
}

/// A chart that could not be turned into a canonical timeline.
///
/// Everything except [`ChartErrorKind::IO`] means the input itself is not a
/// supported chart; the caller has to supply a corrected file.
#[derive(Debug, Error, Clone)]
#[error("{code}: {message} (line {line})")]
pub struct ChartError {
    pub code: &'static str,
    pub kind: ChartErrorKind,
    pub message: String,
    /// 1-based source line, 0 when the position is unknown.
    pub line: usize,

    pub file: Option<String>,
    pub column: Option<usize>,
    pub judge_line: Option<usize>,
    pub context: Option<String>,
}

impl ChartError {
    pub(crate) fn new(code: &'static str, message: impl Into<String>, line: usize) -> Self {
        Self {
            code,
            kind: ChartErrorKind::from_code(code),
            message: message.into(),
            line,

            file: None,
            column: None,
            judge_line: None,
            context: None,
        }
    }

    pub fn is_unsupported_format(&self) -> bool {
        self.kind != ChartErrorKind::IO
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    pub fn with_judge_line(mut self, judge_line: usize) -> Self {
        self.judge_line = Some(judge_line);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}
