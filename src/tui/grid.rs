use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::sequencer::Grid;
use crate::shared::{CellCoord, InstrumentKind, GRID_SIZE};

fn instrument_color(kind: InstrumentKind) -> Color {
    match kind {
        InstrumentKind::Sine => Color::Cyan,
        InstrumentKind::Saw => Color::Yellow,
        InstrumentKind::Square => Color::LightMagenta,
        InstrumentKind::Sample => Color::LightGreen,
    }
}

pub fn draw_cell_grid(
    frame: &mut Frame,
    area: Rect,
    grid: &Grid,
    playhead: Option<u8>,
    cursor: (usize, usize),
    blink_on: bool,
) {
    let row_constraints = [Constraint::Ratio(1, GRID_SIZE as u32); GRID_SIZE];
    let col_constraints = [Constraint::Ratio(1, GRID_SIZE as u32); GRID_SIZE];

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(row_constraints)
        .split(area);

    for (row_idx, row_area) in rows.iter().enumerate() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(col_constraints)
            .split(*row_area);

        for (col_idx, cell_area) in cols.iter().enumerate() {
            let Some(at) = CellCoord::new(row_idx, col_idx) else {
                continue;
            };
            let cell = grid.cell(at);
            let on_playhead = playhead == Some(col_idx as u8);
            let color = instrument_color(cell.instrument);

            let mut style = if cell.active {
                Style::default().fg(Color::Black).bg(color)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            if on_playhead {
                style = if cell.active { style.add_modifier(Modifier::BOLD) } else { style.bg(Color::Rgb(40, 40, 60)) };
            }
            let border = if cursor == (row_idx, col_idx) && blink_on {
                Style::default().fg(Color::White)
            } else if on_playhead {
                Style::default().fg(Color::Gray)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            let label = Line::from(cell.instrument.short_label());
            let block = Block::default().borders(Borders::ALL).border_style(border).style(style);
            frame.render_widget(Paragraph::new(label).block(block).centered(), *cell_area);
        }
    }
}
