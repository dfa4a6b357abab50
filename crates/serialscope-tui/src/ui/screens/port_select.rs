use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::{
    app::AppState,
    ui::{
        Layout, Theme,
        components::{ListEntry, ListSelector, StatusBar},
    },
};

/// Port selection screen
pub struct PortSelectScreen;

impl PortSelectScreen {
    pub fn render(frame: &mut Frame, state: &mut AppState) {
        let area = frame.area();
        let (header_area, content_area, status_area) = Layout::main(area);

        Self::render_header(frame, header_area, state);
        Self::render_list(frame, content_area, state);
        Self::render_status_bar(frame, status_area, state);
    }

    fn render_header(frame: &mut Frame, area: Rect, state: &AppState) {
        let title = Line::from(vec![
            Span::styled("serialscope", Theme::title()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(state.settings.summary(), Theme::text()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled("Select Port", Theme::text_highlight()),
        ]);

        let header = Paragraph::new(title).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border()),
        );

        frame.render_widget(header, area);
    }

    fn render_list(frame: &mut Frame, area: Rect, state: &mut AppState) {
        let list_area = Layout::centered_list(area, 80);

        let selected = state.selected_port.as_deref();
        let entries = state.ports.iter().map(|port| {
            let display = if port.description.is_empty() {
                port.name.clone()
            } else {
                format!("{}  {}", port.name, port.description)
            };
            ListEntry::new(display).current(selected == Some(port.name.as_str()))
        });

        let selector = ListSelector::new(" Ports ")
            .items(entries)
            .empty_text("no serial ports found, press r to rescan");

        frame.render_stateful_widget(selector, list_area, &mut state.ui_state.list_state);
    }

    fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState) {
        let status = StatusBar::new()
            .hints([
                ("↑/k", "Up"),
                ("↓/j", "Down"),
                ("Enter", "Connect"),
                ("r", "Rescan"),
                ("q", "Quit"),
            ])
            .summary(format!("{} ports", state.ports.len()))
            .notice(state.ui_state.message.as_deref());

        frame.render_widget(status, area);
    }
}
