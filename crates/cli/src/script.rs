//! Sheet scripts: one edit per line.
//!
//! ```text
//! # comment
//! A1 12
//! B1 =A1*2
//! C1 'text with a leading quote
//! clear A1
//! ```
//!
//! The first space separates the position from the cell text; everything
//! after it, spaces included, is passed to the sheet verbatim. A position
//! with no text sets the cell to empty.

use tabula_engine::Position;

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Set { pos: Position, text: String },
    Clear(Position),
}

/// A statement and the 1-based line it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub number: usize,
    pub statement: Statement,
}

/// A line that is neither blank, a comment, nor a valid statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub number: usize,
    pub message: String,
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.number, self.message)
    }
}

const CLEAR_KEYWORD: &str = "clear";

/// Parse one line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Statement>, String> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let (head, rest) = trimmed.split_once(' ').unwrap_or((trimmed, ""));

    if head == CLEAR_KEYWORD {
        let target = rest.trim();
        if target.is_empty() {
            return Err("clear needs a position".to_string());
        }
        return parse_position(target).map(|pos| Some(Statement::Clear(pos)));
    }

    let pos = parse_position(head)?;
    Ok(Some(Statement::Set {
        pos,
        text: rest.to_string(),
    }))
}

fn parse_position(s: &str) -> Result<Position, String> {
    s.parse::<Position>()
        .map_err(|_| format!("invalid position {:?}", s))
}

/// Parse a whole script, one result per non-blank, non-comment line.
pub fn parse(source: &str) -> Vec<Result<Line, SyntaxError>> {
    source
        .lines()
        .enumerate()
        .filter_map(|(idx, text)| {
            let number = idx + 1;
            match parse_line(text) {
                Ok(Some(statement)) => Some(Ok(Line { number, statement })),
                Ok(None) => None,
                Err(message) => Some(Err(SyntaxError { number, message })),
            }
        })
        .collect()
}
