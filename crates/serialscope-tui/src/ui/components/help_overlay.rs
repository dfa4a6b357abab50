use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

/// Help overlay showing keybindings
pub struct HelpOverlay;

impl HelpOverlay {
    pub fn render(frame: &mut Frame) {
        let area = frame.area();

        let lines = Self::lines();

        // Center the help popup
        let popup_width = 52.min(area.width.saturating_sub(4));
        let popup_height = (lines.len() as u16 + 2).min(area.height.saturating_sub(2));

        let x = area.x + (area.width.saturating_sub(popup_width)) / 2;
        let y = area.y + (area.height.saturating_sub(popup_height)) / 2;
        let popup_area = Rect::new(x, y, popup_width, popup_height);

        frame.render_widget(Clear, popup_area);

        let help_widget = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(Span::styled(
                    " Help ",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )),
        );

        frame.render_widget(help_widget, popup_area);
    }

    fn lines() -> Vec<Line<'static>> {
        vec![
            Line::from(Span::styled(
                "Keybindings",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Self::section("Navigation"),
            Self::key_line("j/↓", "Scroll down"),
            Self::key_line("k/↑", "Scroll up (loads earlier lines)"),
            Self::key_line("Ctrl+d", "Page down"),
            Self::key_line("Ctrl+u", "Page up"),
            Self::key_line("g", "Top (again: load earlier)"),
            Self::key_line("G", "Bottom and follow"),
            Line::from(""),
            Self::section("Views"),
            Self::key_line("Tab", "Next view"),
            Self::key_line("Shift+Tab", "Previous view"),
            Self::key_line("v", "Pick a view"),
            Self::key_line("x", "Error log (Enter jumps to line)"),
            Line::from(""),
            Self::section("Display"),
            Self::key_line("f", "Toggle follow mode"),
            Self::key_line("t", "Toggle timestamps"),
            Self::key_line("T", "Toggle local/UTC time"),
            Line::from(""),
            Self::section("Actions"),
            Self::key_line("c", "Clear logs"),
            Self::key_line("e", "Export current view"),
            Self::key_line("E", "Export error log"),
            Self::key_line("r", "Reconnect"),
            Self::key_line("d", "Disconnect"),
            Self::key_line("p", "Choose another port"),
            Self::key_line("?", "Toggle this help"),
            Self::key_line("Esc", "Go back"),
            Self::key_line("q", "Quit"),
        ]
    }

    fn section(title: &'static str) -> Line<'static> {
        Line::from(Span::styled(title, Style::default().fg(Color::Yellow)))
    }

    fn key_line(key: &'static str, desc: &'static str) -> Line<'static> {
        Line::from(vec![
            Span::styled(format!("  {:>9}", key), Style::default().fg(Color::Green)),
            Span::styled(format!("  {}", desc), Style::default().fg(Color::White)),
        ])
    }
}
