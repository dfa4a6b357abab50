use chrono::Local;
use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use serialscope_logs::Pipeline;
use serialscope_types::ErrorRecord;

use crate::{
    app::AppState,
    ui::{
        Layout, Theme,
        components::{ListEntry, ListSelector, StatusBar},
    },
};

/// Error log: every classified line, newest last
pub struct ErrorLogScreen;

impl ErrorLogScreen {
    pub fn render(frame: &mut Frame, state: &mut AppState, pipeline: &Pipeline) {
        let (header_area, content_area, status_area) = Layout::main(frame.area());

        Self::render_header(frame, header_area, state);

        let entries: Vec<ListEntry> = state
            .errors
            .iter()
            .map(|record| Self::entry(record, pipeline))
            .collect();
        let title = format!(" Errors ({}) ", entries.len());
        let selector = ListSelector::new(&title)
            .items(entries)
            .empty_text("no errors recorded");
        frame.render_stateful_widget(selector, content_area, &mut state.ui_state.list_state);

        let status = StatusBar::new()
            .hints([
                ("↑/k", "Up"),
                ("↓/j", "Down"),
                ("Enter", "Jump to line"),
                ("Esc", "Back"),
            ])
            .summary(format!("{} total", state.counters.total()))
            .notice(state.ui_state.message.as_deref());
        frame.render_widget(status, status_area);
    }

    fn entry(record: &ErrorRecord, pipeline: &Pipeline) -> ListEntry {
        let time = pipeline
            .index()
            .source_of(record)
            .map(|line| {
                line.timestamp
                    .with_timezone(&Local)
                    .format("%H:%M:%S")
                    .to_string()
            })
            .unwrap_or_else(|| "--:--:--".to_string());

        ListEntry::new(format!(
            "{} #{:<6} [{}] {}",
            time,
            record.source_sequence,
            record.category.as_str(),
            record.text
        ))
        .style(Theme::category_badge(record.category))
    }

    fn render_header(frame: &mut Frame, area: Rect, state: &AppState) {
        let port = state.selected_port.as_deref().unwrap_or("-");

        let title = Line::from(vec![
            Span::styled("serialscope", Theme::title()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(port, Theme::text()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled("Error Log", Theme::text_highlight()),
        ]);

        let header = Paragraph::new(title).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border()),
        );

        frame.render_widget(header, area);
    }
}
