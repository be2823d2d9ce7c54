//! # Tabulator
//!
//! Fixed-width line rendering. Each cell is clipped or space-padded to
//! its column width, cells are concatenated, and trailing whitespace is
//! trimmed. Cells beyond the last width are dropped.

/// Renders rows of cells into fixed-width text lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tabulator {
    widths: Vec<usize>,
}

impl Tabulator {
    /// Create a tabulator with one width per column.
    #[must_use]
    pub fn new(widths: &[usize]) -> Self {
        Self {
            widths: widths.to_vec(),
        }
    }

    /// Column widths.
    #[must_use]
    pub fn widths(&self) -> &[usize] {
        &self.widths
    }

    /// Render one row. Widths count characters, not bytes.
    #[must_use]
    pub fn render<S: AsRef<str>>(&self, cells: &[S]) -> String {
        let mut line = String::with_capacity(self.widths.iter().sum());
        for (cell, &width) in cells.iter().zip(&self.widths) {
            let mut used = 0;
            for c in cell.as_ref().chars().take(width) {
                line.push(c);
                used += 1;
            }
            line.extend(std::iter::repeat_n(' ', width - used));
        }
        line.truncate(line.trim_end().len());
        line
    }

    /// Render every row, one newline-terminated line each.
    #[must_use]
    pub fn render_all<S: AsRef<str>>(&self, rows: &[Vec<S>]) -> String {
        let mut out = String::new();
        for row in rows {
            out.push_str(&self.render(row));
            out.push('\n');
        }
        out
    }
}
