use crate::shared::{CellCoord, InstrumentKind, GRID_SIZE, NUM_CELLS};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cell {
    pub instrument: InstrumentKind,
    pub active: bool,
}

/// The 10x10 activation matrix. Copy, so a published snapshot is one memcpy
/// and the sequencer can hold a private copy for a whole tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Grid {
    cells: [Cell; NUM_CELLS],
}

impl Default for Grid {
    fn default() -> Self {
        Self { cells: [Cell::default(); NUM_CELLS] }
    }
}

impl Grid {
    pub fn cell(&self, at: CellCoord) -> Cell {
        self.cells[at.index()]
    }

    /// Flip the active flag; returns the new value.
    pub fn toggle(&mut self, at: CellCoord) -> bool {
        let cell = &mut self.cells[at.index()];
        cell.active = !cell.active;
        cell.active
    }

    pub fn cycle_instrument(&mut self, at: CellCoord) -> InstrumentKind {
        let cell = &mut self.cells[at.index()];
        cell.instrument = cell.instrument.next();
        cell.instrument
    }

    /// Deactivate every cell. Instruments are kept.
    pub fn clear(&mut self) {
        for cell in self.cells.iter_mut() {
            cell.active = false;
        }
    }

    pub fn active_in_column(&self, col: usize) -> impl Iterator<Item = (CellCoord, Cell)> + '_ {
        (0..GRID_SIZE).filter_map(move |row| {
            let at = CellCoord::new(row, col)?;
            let cell = self.cell(at);
            cell.active.then_some((at, cell))
        })
    }

    pub fn active_count(&self) -> usize {
        self.cells.iter().filter(|c| c.active).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(row: usize, col: usize) -> CellCoord {
        CellCoord::new(row, col).unwrap()
    }

    #[test]
    fn toggle_flips_and_reports() {
        let mut g = Grid::default();
        assert!(g.toggle(at(2, 3)));
        assert!(g.cell(at(2, 3)).active);
        assert!(!g.toggle(at(2, 3)));
        assert_eq!(g, Grid::default());
    }

    #[test]
    fn column_query_is_ordered_by_row() {
        let mut g = Grid::default();
        g.toggle(at(7, 4));
        g.toggle(at(1, 4));
        g.toggle(at(1, 5));
        let rows: Vec<u8> = g.active_in_column(4).map(|(c, _)| c.row).collect();
        assert_eq!(rows, vec![1, 7]);
        assert_eq!(g.active_in_column(10).count(), 0);
    }

    #[test]
    fn clear_keeps_instruments() {
        let mut g = Grid::default();
        g.cycle_instrument(at(0, 0));
        g.toggle(at(0, 0));
        g.toggle(at(9, 9));
        g.clear();
        assert_eq!(g.active_count(), 0);
        assert_eq!(g.cell(at(0, 0)).instrument, InstrumentKind::Saw);
    }
}
