use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, StatefulWidget},
};

use crate::ui::Theme;

/// One row of a [`ListSelector`]
pub struct ListEntry {
    pub text: String,
    /// Marks the entry currently in use (active port, active view)
    pub current: bool,
    /// Overrides the default text style
    pub style: Option<Style>,
}

impl ListEntry {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            current: false,
            style: None,
        }
    }

    pub fn current(mut self, current: bool) -> Self {
        self.current = current;
        self
    }

    pub fn style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }
}

/// A generic list selector component
pub struct ListSelector<'a> {
    items: Vec<ListItem<'a>>,
    title: &'a str,
    empty_text: &'a str,
}

impl<'a> ListSelector<'a> {
    pub fn new(title: &'a str) -> Self {
        Self {
            items: Vec::new(),
            title,
            empty_text: "nothing here",
        }
    }

    pub fn items<I>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = ListEntry>,
    {
        self.items = entries
            .into_iter()
            .map(|entry| {
                let style = match (entry.style, entry.current) {
                    (Some(style), _) => style,
                    (None, true) => Theme::list_item_current(),
                    (None, false) => Theme::list_item(),
                };

                let text = if entry.current {
                    format!("{} (current)", entry.text)
                } else {
                    entry.text
                };

                ListItem::new(Line::from(Span::styled(text, style)))
            })
            .collect();
        self
    }

    /// Placeholder shown when there are no items
    pub fn empty_text(mut self, text: &'a str) -> Self {
        self.empty_text = text;
        self
    }
}

impl StatefulWidget for ListSelector<'_> {
    type State = ListState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Theme::border_focused())
            .title(Span::styled(self.title, Theme::title()));

        let items = if self.items.is_empty() {
            vec![ListItem::new(Span::styled(self.empty_text, Theme::text_dim()))]
        } else {
            self.items
        };

        let list = List::new(items)
            .block(block)
            .highlight_style(Theme::list_item_selected())
            .highlight_symbol("▶ ");

        StatefulWidget::render(list, area, buf, state);
    }
}
