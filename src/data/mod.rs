use std::fmt;
use std::path::{Path, PathBuf};

pub mod dataset;
pub mod state;
pub mod topology;

/// Configuration errors: unreadable or malformed input files. Reported with
/// the file and enough context to fix the input; the process exits non-zero.
#[derive(Debug)]
pub enum LoadError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Format {
        file: String,
        line: usize,
        message: String,
    },
}

impl LoadError {
    pub fn format(file: &str, line: usize, message: impl Into<String>) -> LoadError {
        LoadError::Format {
            file: file.to_string(),
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io { path, source } => {
                write!(f, "could not read {}: {}", path.display(), source)
            }
            LoadError::Format { file, line, message } => {
                if *line > 0 {
                    write!(f, "{}:{}: {}", file, line, message)
                } else {
                    write!(f, "{}: {}", file, message)
                }
            }
        }
    }
}

impl std::error::Error for LoadError {}

/// Read a whole file, keeping only lines that carry content. Empty lines
/// and lines starting with '#' are dropped; 1-based line numbers are kept
/// for error reporting.
pub fn read_significant_lines(path: &Path) -> Result<Vec<(usize, String)>, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content
        .lines()
        .enumerate()
        .filter(|(_, l)| {
            let trimmed = l.trim_start();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .map(|(i, l)| (i + 1, l.to_string()))
        .collect())
}

/// Cursor over the significant lines of one file.
pub struct LineCursor {
    file: String,
    lines: Vec<(usize, String)>,
    pos: usize,
}

impl LineCursor {
    pub fn open(path: &Path) -> Result<LineCursor, LoadError> {
        Ok(LineCursor {
            file: path.display().to_string(),
            lines: read_significant_lines(path)?,
            pos: 0,
        })
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.lines.len()
    }

    pub fn peek(&self) -> Option<&str> {
        self.lines.get(self.pos).map(|(_, l)| l.as_str())
    }

    /// Line number of the most recently taken line, for error context.
    pub fn line_no(&self) -> usize {
        if self.pos == 0 {
            0
        } else {
            self.lines[self.pos - 1].0
        }
    }

    pub fn next_line(&mut self) -> Result<&str, LoadError> {
        match self.lines.get(self.pos) {
            Some((_, l)) => {
                self.pos += 1;
                Ok(l)
            }
            None => Err(LoadError::format(
                &self.file,
                0,
                "unexpected end of file",
            )),
        }
    }

    pub fn error(&self, message: impl Into<String>) -> LoadError {
        LoadError::format(&self.file, self.line_no(), message)
    }
}

pub fn parse_f64(cursor: &LineCursor, token: &str, what: &str) -> Result<f64, LoadError> {
    token
        .parse::<f64>()
        .map_err(|_| cursor.error(format!("could not parse {} from '{}'", what, token)))
}

pub fn parse_i64(cursor: &LineCursor, token: &str, what: &str) -> Result<i64, LoadError> {
    token
        .parse::<i64>()
        .map_err(|_| cursor.error(format!("could not parse {} from '{}'", what, token)))
}
