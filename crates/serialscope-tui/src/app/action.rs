use crate::app::Screen;

/// All possible actions in the application (command pattern)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    // Navigation
    Navigate(Screen),
    GoBack,
    Quit,

    // Selection
    SelectPort(String),
    SelectView(String),
    JumpToError(usize),

    // UI toggles
    ToggleHelp,

    // List navigation
    ListUp,
    ListDown,
    ListSelect,

    // Connection
    RefreshPorts,
    Reconnect,
    Disconnect,

    // Log viewer actions
    ScrollUp(usize),
    ScrollDown(usize),
    ScrollToTop,
    ScrollToBottom,
    PageUp,
    PageDown,
    ToggleAutoScroll,
    ToggleTimestamps,
    ToggleLocalTime,
    NextView,
    PrevView,
    OpenViewPicker,
    OpenErrorLog,
    ClearLogs,
    ExportLogs,
    ExportErrors,
}
