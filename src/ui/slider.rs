use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use tunecast::zone::{TimingState, Zone};

pub const FAIL_CELL: char = '░';
pub const ZONE_CELL: char = '█';
pub const MARKER: char = '▼';

/// Column of a `width`-cell bar that `position` falls in.
pub fn marker_column(width: usize, position: f64) -> Option<usize> {
    if width == 0 || !position.is_finite() {
        return None;
    }
    let col = (position.clamp(0.0, 1.0) * width as f64).floor() as usize;
    Some(col.min(width - 1))
}

/// A cell is part of the zone when its midpoint is.
pub fn is_zone_cell(width: usize, index: usize, zone: &Zone) -> bool {
    zone.contains((index as f64 + 0.5) / width as f64)
}

pub fn bar(width: usize, zone: &Zone) -> String {
    (0..width)
        .map(|i| {
            if is_zone_cell(width, i, zone) {
                ZONE_CELL
            } else {
                FAIL_CELL
            }
        })
        .collect()
}

pub fn marker_line(width: usize, position: Option<f64>) -> String {
    match position.and_then(|p| marker_column(width, p)) {
        Some(col) => format!("{}{MARKER}", " ".repeat(col)),
        None => String::new(),
    }
}

pub fn timing_color(state: TimingState) -> Color {
    match state {
        TimingState::None => Color::DarkGray,
        TimingState::TooEarly => Color::Yellow,
        TimingState::InZone => Color::Green,
        TimingState::TooLate => Color::Red,
    }
}

/// Marker line over the bar, styled for the current timing state.
pub fn slider_lines(
    width: usize,
    zone: &Zone,
    position: Option<f64>,
    state: TimingState,
) -> [Line<'static>; 2] {
    let marker_style = Style::default()
        .fg(timing_color(state))
        .add_modifier(Modifier::BOLD);
    let marker = Line::from(Span::styled(marker_line(width, position), marker_style));

    let bar = bar(width, zone);
    let first_zone = bar.chars().position(|c| c == ZONE_CELL).unwrap_or(width);
    let zone_len = bar.chars().filter(|&c| c == ZONE_CELL).count();
    let cells: Vec<char> = bar.chars().collect();
    let fail_style = Style::default().fg(Color::DarkGray);
    let zone_style = Style::default().fg(Color::Green);
    let bar_line = Line::from(vec![
        Span::styled(cells[..first_zone].iter().collect::<String>(), fail_style),
        Span::styled(
            cells[first_zone..first_zone + zone_len]
                .iter()
                .collect::<String>(),
            zone_style,
        ),
        Span::styled(
            cells[first_zone + zone_len..].iter().collect::<String>(),
            fail_style,
        ),
    ]);

    [marker, bar_line]
}
