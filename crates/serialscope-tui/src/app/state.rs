use std::sync::Arc;

use ratatui::widgets::ListState;
use tokio::sync::mpsc;

use serialscope_logs::{FULL_VIEW, Pipeline, ScrollWindow};
use serialscope_types::{
    ConnectionStatus, ErrorCounters, ErrorRecord, LogLine, PortInfo, SerialSettings, Telemetry,
};

use super::Action;

/// Cached output of the active view so it is not re-evaluated on every render
#[derive(Default)]
pub struct ViewCache {
    /// View the entries were evaluated for
    cached_view: String,
    /// Store length when the cache was built
    cached_store_len: usize,
    /// The cached view output
    pub entries: Vec<Arc<LogLine>>,
    pub is_valid: bool,
}

impl ViewCache {
    pub fn needs_refresh(&self, view: &str, store_len: usize) -> bool {
        !self.is_valid || self.cached_view != view || self.cached_store_len != store_len
    }

    pub fn update(&mut self, view: &str, store_len: usize, entries: Vec<Arc<LogLine>>) {
        self.cached_view = view.to_string();
        self.cached_store_len = store_len;
        self.entries = entries;
        self.is_valid = true;
    }

    pub fn invalidate(&mut self) {
        self.is_valid = false;
    }
}

/// Screen enumeration
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Screen {
    PortSelect,
    LogViewer,
    ViewSelect,
    ErrorLog,
}

/// Ticks a status message stays up (100ms tick rate)
pub const MESSAGE_TICKS: u16 = 40;

/// UI-specific transient state
pub struct UiState {
    /// Is help overlay visible?
    pub help_visible: bool,

    /// List state for selection screens
    pub list_state: ListState,

    /// Notification shown in the status bar (export result, errors)
    pub message: Option<String>,

    /// Ticks left before `message` is cleared
    pub message_ticks: u16,

    /// First row of the materialized window shown in the viewport
    pub log_scroll: usize,

    /// Log rows that fit on screen, updated on every render
    pub viewport_height: usize,

    pub show_timestamps: bool,

    /// Show timestamps in local time (vs UTC)
    pub use_local_time: bool,

    /// Line picked by the last jump, drawn highlighted
    pub highlighted: Option<u64>,

    pub view_cache: ViewCache,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            help_visible: false,
            list_state: ListState::default(),
            message: None,
            message_ticks: 0,
            log_scroll: 0,
            viewport_height: 1,
            show_timestamps: true,
            use_local_time: true,
            highlighted: None,
            view_cache: ViewCache::default(),
        }
    }
}

/// Global application state
pub struct AppState {
    /// Current screen being displayed
    pub current_screen: Screen,

    /// Navigation stack for back navigation
    pub screen_stack: Vec<Screen>,

    /// Ports found by the last scan
    pub ports: Vec<PortInfo>,

    /// Port of the current (or last) connection
    pub selected_port: Option<String>,

    pub settings: SerialSettings,

    pub status: ConnectionStatus,

    /// Name of the view shown in the log viewer
    pub active_view: String,

    /// Views offered by the view picker, in display order
    pub view_names: Vec<String>,

    /// Scroll-back window over the active view's output
    pub window: ScrollWindow,

    pub telemetry: Telemetry,

    pub counters: ErrorCounters,

    /// Error log as of the last refresh
    pub errors: Vec<ErrorRecord>,

    /// UI state
    pub ui_state: UiState,

    /// Whether app should quit
    pub should_quit: bool,

    /// Channel sender for async actions
    pub action_tx: mpsc::UnboundedSender<Action>,

    /// Dirty flag for rendering - only render when true
    pub render_dirty: bool,
}

impl AppState {
    pub fn new(
        action_tx: mpsc::UnboundedSender<Action>,
        settings: SerialSettings,
        window: ScrollWindow,
        view_names: Vec<String>,
    ) -> Self {
        let mut ui_state = UiState::default();
        ui_state.list_state.select(Some(0));

        Self {
            current_screen: Screen::PortSelect,
            screen_stack: Vec::new(),
            ports: Vec::new(),
            selected_port: None,
            settings,
            status: ConnectionStatus::Disconnected,
            active_view: FULL_VIEW.to_string(),
            view_names,
            window,
            telemetry: Telemetry::default(),
            counters: ErrorCounters::default(),
            errors: Vec::new(),
            ui_state,
            should_quit: false,
            action_tx,
            render_dirty: true, // Start dirty to ensure initial render
        }
    }

    /// Navigate to a new screen, pushing current to stack
    pub fn navigate_to(&mut self, screen: Screen) {
        self.screen_stack.push(self.current_screen.clone());
        self.current_screen = screen;
        self.ui_state.list_state.select(Some(0));
    }

    /// Go back to previous screen
    pub fn go_back(&mut self) -> bool {
        if let Some(prev_screen) = self.screen_stack.pop() {
            self.current_screen = prev_screen;
            self.ui_state.list_state.select(Some(0));
            true
        } else {
            false
        }
    }

    /// Get the current list length based on screen
    pub fn current_list_len(&self) -> usize {
        match self.current_screen {
            Screen::PortSelect => self.ports.len(),
            Screen::ViewSelect => self.view_names.len(),
            Screen::ErrorLog => self.errors.len(),
            Screen::LogViewer => 0,
        }
    }

    /// Move selection up
    pub fn list_up(&mut self) {
        let len = self.current_list_len();
        if len == 0 {
            return;
        }

        let i = match self.ui_state.list_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.ui_state.list_state.select(Some(i));
    }

    /// Move selection down
    pub fn list_down(&mut self) {
        let len = self.current_list_len();
        if len == 0 {
            return;
        }

        let i = match self.ui_state.list_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.ui_state.list_state.select(Some(i));
    }

    /// Get currently selected index
    pub fn selected_index(&self) -> Option<usize> {
        self.ui_state.list_state.selected()
    }

    pub fn show_message(&mut self, msg: String) {
        self.ui_state.message = Some(msg);
        self.ui_state.message_ticks = MESSAGE_TICKS;
    }

    pub fn dismiss_message(&mut self) {
        self.ui_state.message = None;
        self.ui_state.message_ticks = 0;
    }

    /// Age the status message by one tick; true when it just expired
    pub fn tick(&mut self) -> bool {
        if self.ui_state.message.is_none() {
            return false;
        }
        self.ui_state.message_ticks = self.ui_state.message_ticks.saturating_sub(1);
        if self.ui_state.message_ticks == 0 {
            self.dismiss_message();
            return true;
        }
        false
    }

    /// Switch the log viewer to another view, following its tail
    pub fn set_view(&mut self, name: &str) {
        self.active_view = name.to_string();
        self.ui_state.view_cache.invalidate();
        self.ui_state.highlighted = None;
        self.ui_state.log_scroll = 0;
        self.window.reset(0);
    }

    /// Forget everything derived from the log after a clear
    pub fn clear_logs(&mut self) {
        self.ui_state.view_cache.invalidate();
        self.ui_state.highlighted = None;
        self.ui_state.log_scroll = 0;
        self.window.reset(0);
        self.errors.clear();
        self.counters = ErrorCounters::default();
        self.telemetry = Telemetry::default();
    }

    /// Re-evaluate the active view if the store changed since the last call
    pub fn refresh(&mut self, pipeline: &Pipeline) -> bool {
        let store_len = pipeline.index().len();
        if !self
            .ui_state
            .view_cache
            .needs_refresh(&self.active_view, store_len)
        {
            return false;
        }

        // One snapshot so the view, errors and counters agree with each other
        let snapshot = pipeline.index().snapshot();
        let entries = pipeline.views().evaluate(&self.active_view, &snapshot.visible);
        self.ui_state
            .view_cache
            .update(&self.active_view, snapshot.visible.len(), entries);
        self.errors = snapshot.errors;
        self.counters = snapshot.counters;
        self.telemetry = pipeline.telemetry();

        self.window.sync(self.ui_state.view_cache.entries.len());
        self.render_dirty = true;
        true
    }

    /// Total lines in the active view's output
    pub fn view_len(&self) -> usize {
        self.ui_state.view_cache.entries.len()
    }

    /// The materialized part of the active view
    pub fn visible_slice(&self) -> &[Arc<LogLine>] {
        self.window.materialize(&self.ui_state.view_cache.entries)
    }

    /// Fit the scroll offset to a viewport of `height` rows
    ///
    /// Consumes a pending jump highlight by centring it, otherwise pins the
    /// viewport to the bottom while following.
    pub fn settle_viewport(&mut self, height: usize) {
        self.ui_state.viewport_height = height.max(1);
        let height = self.ui_state.viewport_height;
        let slice_len = self.visible_slice().len();
        let max_scroll = slice_len.saturating_sub(height);

        if let Some(sequence) = self.window.take_highlight() {
            let position = self
                .visible_slice()
                .iter()
                .position(|l| l.sequence == sequence);
            if let Some(position) = position {
                self.ui_state.log_scroll = position.saturating_sub(height / 2);
            }
            self.ui_state.highlighted = Some(sequence);
        } else if self.window.autoscroll() {
            self.ui_state.log_scroll = max_scroll;
        }

        self.ui_state.log_scroll = self.ui_state.log_scroll.min(max_scroll);
    }

    /// Scroll towards older lines, pulling in earlier history at the top
    pub fn scroll_up(&mut self, rows: usize) {
        if rows == 0 {
            return;
        }
        let total = self.view_len();
        self.window.set_autoscroll(false, total);

        let mut scroll = self.ui_state.log_scroll;
        while scroll < rows {
            match self.window.load_earlier() {
                Some(adjustment) => scroll += adjustment.prepended,
                None => break,
            }
        }
        self.ui_state.log_scroll = scroll.saturating_sub(rows);
    }

    /// Scroll towards newer lines; reaching the tail resumes following
    pub fn scroll_down(&mut self, rows: usize) {
        let total = self.view_len();
        let height = self.ui_state.viewport_height;
        let target = self.ui_state.log_scroll + rows;
        let max_scroll = self.window.len().saturating_sub(height);

        if target <= max_scroll {
            self.ui_state.log_scroll = target;
            return;
        }

        let before = self.window.state().window_start;
        self.window.scroll_down(target - max_scroll, total);
        let shifted = self.window.state().window_start - before;
        self.ui_state.log_scroll =
            (target - shifted).min(self.window.len().saturating_sub(height));
    }

    pub fn page_up(&mut self) {
        self.scroll_up(self.ui_state.viewport_height);
    }

    pub fn page_down(&mut self) {
        self.scroll_down(self.ui_state.viewport_height);
    }

    /// Jump to the top of the window; at the top already, load an earlier chunk
    pub fn scroll_to_top(&mut self) {
        let total = self.view_len();
        self.window.set_autoscroll(false, total);
        if self.ui_state.log_scroll == 0 {
            self.window.load_earlier();
        }
        self.ui_state.log_scroll = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        let total = self.view_len();
        self.window.set_autoscroll(true, total);
    }

    pub fn toggle_follow(&mut self) {
        let total = self.view_len();
        let enabled = !self.window.autoscroll();
        self.window.set_autoscroll(enabled, total);
    }

    /// Show the source line of error record `index` in the full view
    pub fn jump_to_error(&mut self, index: usize, pipeline: &Pipeline) -> bool {
        let Some(record) = self.errors.get(index).cloned() else {
            return false;
        };

        self.set_view(FULL_VIEW);
        self.refresh(pipeline);

        let found = self
            .window
            .jump_to_sequence(record.source_sequence, &self.ui_state.view_cache.entries)
            .is_some();

        if found && self.current_screen == Screen::ErrorLog {
            self.go_back();
        }
        found
    }
}
