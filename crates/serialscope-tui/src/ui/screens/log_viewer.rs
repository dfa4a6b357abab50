use chrono::Local;
use ratatui::{
    Frame,
    layout::{Margin, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use serialscope_logs::Pipeline;
use serialscope_types::{ErrorCategory, LogLine};

use crate::app::AppState;
use crate::ui::components::StatusBar;
use crate::ui::{Layout, Theme};

/// Log viewer screen
pub struct LogViewerScreen;

/// Cut `text` to at most `max_width` terminal columns, marking the cut with `…`
fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > max_width - 1 {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

impl LogViewerScreen {
    pub fn render(frame: &mut Frame, state: &mut AppState, pipeline: &Pipeline) {
        let areas = Layout::log_viewer(frame.area());

        Self::render_header(frame, areas.header, state);
        Self::render_telemetry(frame, areas.telemetry, state);
        Self::render_counters(frame, areas.counters, state, pipeline.index().hidden_len());
        Self::render_logs(frame, areas.logs, state, pipeline);
        Self::render_status_bar(frame, areas.status, state);
    }

    fn render_header(frame: &mut Frame, area: Rect, state: &AppState) {
        let port = state.selected_port.as_deref().unwrap_or("-");

        let title = Line::from(vec![
            Span::styled("serialscope", Theme::title()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(port, Theme::text_highlight()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(state.settings.summary(), Theme::text()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(
                state.status.label().to_string(),
                Style::default().fg(state.status.color()),
            ),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled("view: ", Theme::text_dim()),
            Span::styled(state.active_view.clone(), Theme::title()),
        ]);

        let header = Paragraph::new(title).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border()),
        );

        frame.render_widget(header, area);
    }

    fn render_telemetry(frame: &mut Frame, area: Rect, state: &AppState) {
        let line = Line::from(vec![
            Span::styled(" ", Theme::text()),
            Span::styled(state.telemetry.summary(), Theme::text()),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_counters(frame: &mut Frame, area: Rect, state: &AppState, hidden: usize) {
        let mut spans = vec![Span::styled(" ", Theme::text())];

        for category in ErrorCategory::ALL {
            spans.push(Span::styled(
                format!("{}:", category.as_str()),
                Theme::category_badge(category),
            ));
            spans.push(Span::styled(
                format!("{} ", state.counters.get(category)),
                Theme::text(),
            ));
        }

        spans.push(Span::styled("│ ", Theme::text_dim()));
        spans.push(Span::styled("hidden:", Theme::text_dim()));
        spans.push(Span::styled(format!("{}", hidden), Theme::text()));

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_logs(frame: &mut Frame, area: Rect, state: &mut AppState, pipeline: &Pipeline) {
        // Calculate visible area (accounting for border)
        let inner_height = area.height.saturating_sub(2) as usize;
        state.settle_viewport(inner_height);

        // 2 for borders, 2 for scrollbar
        let inner_width = area.width.saturating_sub(4) as usize;
        let classifier = pipeline.index().classifier();
        let scroll = state.ui_state.log_scroll;

        let lines: Vec<Line> = state
            .visible_slice()
            .iter()
            .skip(scroll)
            .take(inner_height)
            .map(|line| {
                let category = classifier.classify(&line.text);
                Self::format_line(line, category, state, inner_width)
            })
            .collect();

        let total = state.view_len();
        let window = state.window.state();
        let more = if state.window.has_earlier() {
            " ↑ more"
        } else {
            ""
        };
        let title = format!(
            " {} ({} lines, showing {}-{}){} ",
            state.active_view, total, window.window_start, window.window_end, more
        );

        let logs_widget = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border())
                .title(Span::styled(title, Theme::title())),
        );

        frame.render_widget(logs_widget, area);

        if total > inner_height {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("▲"))
                .end_symbol(Some("▼"));

            // Position over the whole view output, not just the window
            let max_scroll = total.saturating_sub(inner_height);
            let position = (window.window_start + scroll).min(max_scroll);
            let mut scrollbar_state = ScrollbarState::default()
                .content_length(max_scroll)
                .position(position);

            frame.render_stateful_widget(
                scrollbar,
                area.inner(Margin {
                    vertical: 1,
                    horizontal: 0,
                }),
                &mut scrollbar_state,
            );
        }
    }

    fn format_line(
        line: &LogLine,
        category: Option<ErrorCategory>,
        state: &AppState,
        available_width: usize,
    ) -> Line<'static> {
        let mut spans = Vec::new();
        let mut prefix_width = 0;

        if state.ui_state.show_timestamps {
            let ts = if state.ui_state.use_local_time {
                line.timestamp
                    .with_timezone(&Local)
                    .format("%H:%M:%S%.3f")
                    .to_string()
            } else {
                line.timestamp.format("%H:%M:%S%.3f").to_string()
            };
            prefix_width += ts.width() + 1;
            spans.push(Span::styled(format!("{} ", ts), Theme::text_dim()));
        }

        if let Some(category) = category {
            let badge = format!("[{}] ", category.as_str());
            prefix_width += badge.width();
            spans.push(Span::styled(badge, Theme::category_badge(category)));
        }

        let style = if state.ui_state.highlighted == Some(line.sequence) {
            Theme::log_line_jump_target()
        } else {
            Theme::log_line(category)
        };
        let text = truncate_to_width(&line.text, available_width.saturating_sub(prefix_width));
        spans.push(Span::styled(text, style));

        Line::from(spans)
    }

    fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState) {
        let follow = if state.window.autoscroll() { "▼" } else { " " };

        let status = StatusBar::new()
            .hints([
                ("Tab", "View"),
                ("x", "Errors"),
                ("f", "Follow"),
                ("e", "Export"),
                ("?", "Help"),
            ])
            .summary(format!("{} lines {}", state.view_len(), follow))
            .notice(state.ui_state.message.as_deref());

        frame.render_widget(status, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_untouched() {
        assert_eq!(truncate_to_width("boot ok", 20), "boot ok");
    }

    #[test]
    fn test_truncate_marks_cut() {
        assert_eq!(truncate_to_width("Connection attempt 7", 10), "Connectio…");
        assert_eq!(truncate_to_width("abc", 0), "");
    }

    #[test]
    fn test_truncate_counts_columns_not_bytes() {
        // Each CJK glyph is two columns wide
        let cut = truncate_to_width("温度温度温度", 7);
        assert_eq!(cut, "温度温…");
        assert!(cut.width() <= 7);
    }
}
