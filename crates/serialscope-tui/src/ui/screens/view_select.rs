use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use serialscope_logs::Pipeline;

use crate::{
    app::AppState,
    ui::{
        Layout, Theme,
        components::{ListEntry, ListSelector, StatusBar, list_nav_hints},
    },
};

/// Named view picker
pub struct ViewSelectScreen;

impl ViewSelectScreen {
    pub fn render(frame: &mut Frame, state: &mut AppState, pipeline: &Pipeline) {
        let (header_area, content_area, status_area) = Layout::main(frame.area());

        Self::render_header(frame, header_area, state);

        let list_area = Layout::centered_list(content_area, 80);
        let entries = pipeline.views().views().iter().map(|view| {
            let case = if view.case_sensitive { " [Aa]" } else { "" };
            ListEntry::new(format!("{:<12} {}{}", view.name, view.describe(), case))
                .current(view.name == state.active_view)
        });
        let selector = ListSelector::new(" Views ").items(entries);
        frame.render_stateful_widget(selector, list_area, &mut state.ui_state.list_state);

        let status = StatusBar::new()
            .hints(list_nav_hints())
            .summary(format!("{} views", state.view_names.len()))
            .notice(state.ui_state.message.as_deref());
        frame.render_widget(status, status_area);
    }

    fn render_header(frame: &mut Frame, area: Rect, state: &AppState) {
        let port = state.selected_port.as_deref().unwrap_or("-");

        let title = Line::from(vec![
            Span::styled("serialscope", Theme::title()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(port, Theme::text()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled("Select View", Theme::text_highlight()),
        ]);

        let header = Paragraph::new(title).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border()),
        );

        frame.render_widget(header, area);
    }
}
