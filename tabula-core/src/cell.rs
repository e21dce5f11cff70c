use std::fmt;

/// Zero-based grid coordinate. `A1` is `{ row: 0, col: 0 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellIdx {
    pub row: usize,
    pub col: usize,
}
impl CellIdx {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Parses a cell name such as `B12` or `aa3`.
    ///
    /// Letters are case-insensitive. Returns `None` for anything that is not a
    /// letter run followed by a digit run, for row `0` (rows are 1-based), and
    /// for coordinates that overflow `usize`.
    pub fn parse(name: &str) -> Option<Self> {
        let split = name.find(|c: char| !c.is_ascii_alphabetic())?;
        let (letters, digits) = name.split_at(split);
        if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let col = column_index(letters)?;
        let row = digits.parse::<usize>().ok()?.checked_sub(1)?;

        Some(Self { row, col })
    }

    /// Canonical uppercase name of the cell
    pub fn name(&self) -> String {
        self.to_string()
    }
}
impl fmt::Display for CellIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_name(self.col), self.row + 1)
    }
}

pub fn is_cell_name(name: &str) -> bool {
    CellIdx::parse(name).is_some()
}

/// Uppercases cell names, leaves free variable names untouched
pub fn canonical_name(name: &str) -> String {
    match CellIdx::parse(name) {
        Some(idx) => idx.name(),
        None => name.to_string(),
    }
}

/// Converts column letters to a zero-based index, `A` = 0, `Z` = 25, `AA` = 26
///
/// Letters are bijective base-26 (`A` = 1), so there is no zero digit and
/// every index maps to exactly one letter sequence.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }

    let mut value: usize = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as usize) - ('A' as usize) + 1;
        value = value.checked_mul(26)?.checked_add(digit)?;
    }

    Some(value - 1)
}

/// Converts a zero-based column index to letters, the inverse of [column_index]
pub fn column_name(col: usize) -> String {
    let mut letters = Vec::new();
    // widen so `usize::MAX + 1` cannot overflow
    let mut n = col as u128 + 1;
    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    letters.reverse();

    String::from_utf8_lossy(&letters).into_owned()
}

/// Most cells a single range may name
pub const MAX_RANGE_CELLS: usize = 1 << 20;

/// Number of cells between two corners, `None` if it overflows `usize`
pub fn range_len(start: CellIdx, end: CellIdx) -> Option<usize> {
    let rows = start.row.abs_diff(end.row).checked_add(1)?;
    let cols = start.col.abs_diff(end.col).checked_add(1)?;
    rows.checked_mul(cols)
}

/// Enumerates every cell between two corners, row-major
///
/// Each dimension steps toward the other endpoint, so a range written
/// backwards (`B3:A1`) is enumerated backwards.
pub fn expand_range(start: CellIdx, end: CellIdx) -> Vec<CellIdx> {
    let rows = steps(start.row, end.row);
    let cols = steps(start.col, end.col);

    rows.iter()
        .flat_map(|&row| cols.iter().map(move |&col| CellIdx::new(row, col)))
        .collect()
}

fn steps(from: usize, to: usize) -> Vec<usize> {
    if from <= to {
        (from..=to).collect()
    } else {
        (to..=from).rev().collect()
    }
}
