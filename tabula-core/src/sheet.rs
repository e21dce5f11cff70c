use crate::cell::CellIdx;

/// A grid of text cells, addressed row-major
///
/// The grid is a plain `Vec` of rows. Rows may differ in length until
/// [Sheet::ensure_dimensions] pads them to fit the cells a program references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    rows: Vec<Vec<String>>,
}

/// Most empty cells [Sheet::ensure_dimensions] will add to a grid
pub const MAX_GROWTH: usize = 1 << 24;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cell {cell} would grow the grid by more than {} cells", MAX_GROWTH)]
pub struct GridTooLarge {
    /// Bottom right corner the grid would need
    pub cell: CellIdx,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{axis} {index} out of bounds for cell {cell}")]
pub struct OutOfBounds {
    pub axis: &'static str,
    pub index: usize,
    pub cell: CellIdx,
}

impl Sheet {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Trims every cell and grows the grid so every referenced cell exists
    ///
    /// Short rows are right-padded with empty strings and missing rows are
    /// appended. Rows wider than required are left alone. Fails without
    /// growing anything if that would add more than [MAX_GROWTH] cells.
    pub fn ensure_dimensions(
        &mut self,
        cells: impl IntoIterator<Item = CellIdx>,
    ) -> Result<(), GridTooLarge> {
        for row in &mut self.rows {
            for cell in row.iter_mut() {
                let trimmed = cell.trim();
                if trimmed.len() != cell.len() {
                    *cell = trimmed.to_string();
                }
            }
        }

        let Some((height, width)) = cells
            .into_iter()
            .map(|c| (c.row.saturating_add(1), c.col.saturating_add(1)))
            .reduce(|(h, w), (r, c)| (h.max(r), w.max(c)))
        else {
            return Ok(());
        };

        let padding = self
            .rows
            .iter()
            .map(|row| width.saturating_sub(row.len()))
            .fold(0, usize::saturating_add);
        let appended = height.saturating_sub(self.rows.len()).saturating_mul(width);
        if padding.saturating_add(appended) > MAX_GROWTH {
            return Err(GridTooLarge {
                cell: CellIdx::new(height - 1, width - 1),
            });
        }

        for row in &mut self.rows {
            if row.len() < width {
                row.resize(width, String::new());
            }
        }
        if self.rows.len() < height {
            self.rows.resize(height, vec![String::new(); width]);
        }
        Ok(())
    }

    /// Returns the text at the given cell, or `None` past the edge of the grid
    pub fn get(&self, idx: CellIdx) -> Option<&str> {
        self.rows
            .get(idx.row)
            .and_then(|row| row.get(idx.col))
            .map(String::as_str)
    }

    /// Replaces the text at the given cell
    ///
    /// Returns the previous text
    pub fn set(&mut self, idx: CellIdx, text: String) -> Result<String, OutOfBounds> {
        let row = self.rows.get_mut(idx.row).ok_or(OutOfBounds {
            axis: "row",
            index: idx.row,
            cell: idx,
        })?;
        let cell = row.get_mut(idx.col).ok_or(OutOfBounds {
            axis: "column",
            index: idx.col,
            cell: idx,
        })?;

        Ok(std::mem::replace(cell, text))
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<String>> {
        self.rows
    }
}

impl From<Vec<Vec<String>>> for Sheet {
    fn from(rows: Vec<Vec<String>>) -> Self {
        Self::new(rows)
    }
}
