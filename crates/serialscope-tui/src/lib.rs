//! TUI components for serialscope
//!
//! This crate provides the terminal user interface for serialscope,
//! including state management, keybindings, event handling, and UI components.

pub mod app;
pub mod config;
pub mod tui;
pub mod ui;

pub use app::{Action, AppState, Screen, UiState, ViewCache};
pub use config::{KeyBinding, KeyBindings, KeyContext};
pub use tui::{Event, EventHandler, Tui};
pub use ui::components::{HelpOverlay, ListEntry, ListSelector, StatusBar, list_nav_hints};
pub use ui::screens::{ErrorLogScreen, LogViewerScreen, PortSelectScreen, ViewSelectScreen};
pub use ui::{Layout, LogViewerAreas, Theme};
