//! Cell positions and sheet limits.
//!
//! A `Position` is a zero-based (row, column) pair, shown to users in A1
//! notation (`A1` is row 0, column 0; `AA10` is row 9, column 26).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParsePositionError;

/// Coordinate of a cell in the sheet.
///
/// Ordering is row-major, which is also the order in which referenced
/// cells are reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Row index (0-based)
    pub row: usize,
    /// Column index (0-based)
    pub col: usize,
}

impl Position {
    #[inline]
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Parse A1 notation: upper-case column letters followed by a 1-based row.
    ///
    /// Returns `None` for anything else, including row `0` and coordinates
    /// that do not fit in `usize`. Bounds are not checked here, see
    /// [`Limits::contains`].
    pub fn from_a1(name: &str) -> Option<Self> {
        let split = name.find(|c: char| !c.is_ascii_uppercase())?;
        let (letters, digits) = name.split_at(split);
        if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let mut col_acc = 0usize;
        for c in letters.bytes() {
            let digit = (c - b'A') as usize + 1;
            col_acc = col_acc.checked_mul(26)?.checked_add(digit)?;
        }

        let row = digits.parse::<usize>().ok()?.checked_sub(1)?;
        Some(Self::new(row, col_acc - 1))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", col_to_letters(self.col), self.row as u128 + 1)
    }
}

impl FromStr for Position {
    type Err = ParsePositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_a1(s).ok_or_else(|| ParsePositionError(s.to_string()))
    }
}

/// Convert 0-based column index to letter(s): 0 -> A, 25 -> Z, 26 -> AA.
pub(crate) fn col_to_letters(col: usize) -> String {
    let mut result = String::new();
    let mut n = col as u128 + 1;
    while n > 0 {
        n -= 1;
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }
    result
}

/// Number of rows and columns of a rectangle anchored at `A1`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Size {
    pub rows: usize,
    pub cols: usize,
}

impl Size {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }
}

/// Addressable extent of a sheet.
///
/// Formulas may name positions outside the limits; such references are
/// kept in the formula text but resolve to `#REF!`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Limits {
    pub max_rows: usize,
    pub max_cols: usize,
}

impl Limits {
    pub const DEFAULT_MAX_ROWS: usize = 16384;
    pub const DEFAULT_MAX_COLS: usize = 16384;

    pub fn new(max_rows: usize, max_cols: usize) -> Self {
        Self { max_rows, max_cols }
    }

    #[inline]
    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.max_rows && pos.col < self.max_cols
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ROWS, Self::DEFAULT_MAX_COLS)
    }
}
