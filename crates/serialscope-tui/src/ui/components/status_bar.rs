use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::Widget,
};
use unicode_width::UnicodeWidthStr;

use crate::ui::Theme;

/// Bottom bar: key hints on the left, a notice or summary on the right.
///
/// The right side is never hidden; hints that do not fit are dropped from the end.
pub struct StatusBar<'a> {
    hints: Vec<(&'a str, &'a str)>,
    summary: String,
    notice: Option<&'a str>,
}

impl<'a> StatusBar<'a> {
    pub fn new() -> Self {
        Self {
            hints: Vec::new(),
            summary: String::new(),
            notice: None,
        }
    }

    pub fn hints<I>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.hints = hints.into_iter().collect();
        self
    }

    /// Counts shown while there is no notice
    pub fn summary(mut self, text: impl Into<String>) -> Self {
        self.summary = text.into();
        self
    }

    /// Transient message that replaces the summary
    pub fn notice(mut self, notice: Option<&'a str>) -> Self {
        self.notice = notice;
        self
    }

    fn right_span(&self) -> Span<'_> {
        match self.notice {
            Some(notice) => Span::styled(notice, Theme::status_bar_notice()),
            None => Span::styled(self.summary.as_str(), Theme::status_bar()),
        }
    }
}

impl Default for StatusBar<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, Theme::status_bar());
        if area.width < 2 {
            return;
        }

        let inner_width = area.width - 2;
        let right = self.right_span();
        let right_width = (right.content.width() as u16).min(inner_width);
        let right_x = area.x + 1 + inner_width - right_width;
        buf.set_span(right_x, area.y, &right, right_width);

        // Hints get whatever the right side leaves, one whole hint at a time
        let budget = inner_width.saturating_sub(right_width + 2) as usize;
        let mut used = 0;
        let mut spans = Vec::new();
        for (key, desc) in &self.hints {
            let sep = if spans.is_empty() { "" } else { "  " };
            let key = format!("{}[{}]", sep, key);
            let desc = format!(" {}", desc);
            let width = key.width() + desc.width();
            if used + width > budget {
                break;
            }
            used += width;
            spans.push(Span::styled(key, Theme::status_bar_key()));
            spans.push(Span::styled(desc, Theme::status_bar()));
        }

        buf.set_line(area.x + 1, area.y, &Line::from(spans), budget as u16);
    }
}

/// Default hints for list navigation screens
pub fn list_nav_hints() -> Vec<(&'static str, &'static str)> {
    vec![
        ("↑/k", "Up"),
        ("↓/j", "Down"),
        ("Enter", "Select"),
        ("Esc", "Back"),
        ("q", "Quit"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(bar: StatusBar, width: u16) -> String {
        let area = Rect::new(0, 0, width, 1);
        let mut buf = Buffer::empty(area);
        bar.render(area, &mut buf);
        (0..width)
            .map(|x| buf[(x, 0)].symbol().to_string())
            .collect::<String>()
    }

    #[test]
    fn test_summary_when_no_notice() {
        let text = rendered(
            StatusBar::new().hints([("?", "Help")]).summary("12 lines"),
            40,
        );
        assert!(text.contains("[?] Help"));
        assert!(text.trim_end().ends_with("12 lines"));
    }

    #[test]
    fn test_notice_replaces_summary() {
        let text = rendered(
            StatusBar::new()
                .summary("12 lines")
                .notice(Some("Connected to /dev/ttyUSB0")),
            40,
        );
        assert!(text.contains("Connected to /dev/ttyUSB0"));
        assert!(!text.contains("12 lines"));
    }

    #[test]
    fn test_narrow_bar_drops_trailing_hints() {
        let text = rendered(
            StatusBar::new()
                .hints([("j", "Down"), ("k", "Up"), ("e", "Export")])
                .summary("500 lines"),
            32,
        );
        assert!(text.contains("[j] Down"));
        assert!(!text.contains("Export"));
        assert!(text.contains("500 lines"));
    }
}
