use crate::shared::GRID_SIZE;

// state local to the tui: just the cursor. Everything else is read from
// DisplayState each frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TuiState {
    pub cursor_row: usize,
    pub cursor_col: usize,
}

impl TuiState {
    // clamps at the edges, no wrap
    pub fn move_cursor(&mut self, d_row: isize, d_col: isize) {
        let max = GRID_SIZE as isize - 1;
        self.cursor_row = (self.cursor_row as isize + d_row).clamp(0, max) as usize;
        self.cursor_col = (self.cursor_col as isize + d_col).clamp(0, max) as usize;
    }
}
