use ratatui::layout::{Constraint, Direction, Layout as RatatuiLayout, Rect};

/// Layout helper for consistent screen layouts
pub struct Layout;

/// Areas of the log viewer screen, top to bottom
pub struct LogViewerAreas {
    pub header: Rect,
    pub telemetry: Rect,
    pub counters: Rect,
    pub logs: Rect,
    pub status: Rect,
}

impl Layout {
    /// Create the main layout with header, content, and status bar
    pub fn main(area: Rect) -> (Rect, Rect, Rect) {
        let chunks = RatatuiLayout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(1),    // Content
                Constraint::Length(1), // Status bar
            ])
            .split(area);

        (chunks[0], chunks[1], chunks[2])
    }

    /// Create a centered content area (for selection screens)
    pub fn centered_list(area: Rect, width_percent: u16) -> Rect {
        let horizontal = RatatuiLayout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage((100 - width_percent) / 2),
                Constraint::Percentage(width_percent),
                Constraint::Percentage((100 - width_percent) / 2),
            ])
            .split(area);

        let vertical = RatatuiLayout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .split(horizontal[1]);

        vertical[1]
    }

    /// Header, telemetry line, counters bar, log pane and status bar
    pub fn log_viewer(area: Rect) -> LogViewerAreas {
        let chunks = RatatuiLayout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Length(1), // Telemetry
                Constraint::Length(1), // Counters
                Constraint::Min(1),    // Logs
                Constraint::Length(1), // Status bar
            ])
            .split(area);

        LogViewerAreas {
            header: chunks[0],
            telemetry: chunks[1],
            counters: chunks[2],
            logs: chunks[3],
            status: chunks[4],
        }
    }
}
