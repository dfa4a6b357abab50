mod config;

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio::sync::mpsc;
use tracing::{info, warn};

use serialscope_logs::{
    FULL_VIEW, Pipeline, PipelineUpdate, SessionEvent, SessionManager, export_errors,
};
use serialscope_serial::{SerialTransport, available_ports};
use serialscope_tui::{
    Action, AppState, ErrorLogScreen, Event, EventHandler, HelpOverlay, KeyBindings, KeyContext,
    LogViewerScreen, PortSelectScreen, Screen, Tui, ViewSelectScreen,
};
use serialscope_types::{ConnectionStatus, FlowControl, Parity, StopBits};

use config::{AppConfig, Overrides, data_bits_from};

/// Serialscope - A terminal UI for tailing and classifying serial device logs
#[derive(Parser, Debug)]
#[command(name = "serialscope")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Serial port to open (optional, will prompt if not provided)
    #[arg(value_name = "PORT")]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Data bits per character
    #[arg(long, value_parser = clap::value_parser!(u8).range(5..=8))]
    data_bits: Option<u8>,

    #[arg(long, value_enum)]
    parity: Option<ParityArg>,

    #[arg(long, value_enum)]
    stop_bits: Option<StopBitsArg>,

    #[arg(long, value_enum)]
    flow_control: Option<FlowControlArg>,

    /// Config file (default: ./serialscope.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// View to open the log viewer with
    #[arg(long)]
    view: Option<String>,

    /// Maximum lines kept in the scroll-back window
    #[arg(long)]
    max_visible: Option<usize>,

    /// Write diagnostics to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print available serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ParityArg {
    None,
    Odd,
    Even,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StopBitsArg {
    #[value(name = "1")]
    One,
    #[value(name = "2")]
    Two,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FlowControlArg {
    None,
    Software,
    Hardware,
}

impl From<ParityArg> for Parity {
    fn from(arg: ParityArg) -> Self {
        match arg {
            ParityArg::None => Parity::None,
            ParityArg::Odd => Parity::Odd,
            ParityArg::Even => Parity::Even,
        }
    }
}

impl From<StopBitsArg> for StopBits {
    fn from(arg: StopBitsArg) -> Self {
        match arg {
            StopBitsArg::One => StopBits::One,
            StopBitsArg::Two => StopBits::Two,
        }
    }
}

impl From<FlowControlArg> for FlowControl {
    fn from(arg: FlowControlArg) -> Self {
        match arg {
            FlowControlArg::None => FlowControl::None,
            FlowControlArg::Software => FlowControl::Software,
            FlowControlArg::Hardware => FlowControl::Hardware,
        }
    }
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            baud_rate: self.baud,
            data_bits: self.data_bits.and_then(data_bits_from),
            parity: self.parity.map(Into::into),
            stop_bits: self.stop_bits.map(Into::into),
            flow_control: self.flow_control.map(Into::into),
            max_visible: self.max_visible,
            view: self.view.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(args.log_file.as_deref())?;

    if args.list_ports {
        return list_ports();
    }

    // Run the application
    let result = run_app(args).await;

    // Handle any errors
    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn list_ports() -> Result<()> {
    let ports = available_ports().context("Failed to enumerate serial ports")?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{:<24} {}", port.name, port.description);
    }
    Ok(())
}

/// Internal actions for async operations
enum InternalAction {
    Connect(String),
    Disconnect,
}

async fn run_app(args: Args) -> Result<()> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    config.apply(args.overrides());

    // Create action channels
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();
    let (internal_tx, mut internal_rx) = mpsc::unbounded_channel::<InternalAction>();
    let (session_tx, mut session_rx) = mpsc::unbounded_channel::<SessionEvent>();

    let pipeline = Pipeline::new(config.pipeline_config());
    let mut session = SessionManager::new(SerialTransport::new());

    // Initialize state
    let view_names = pipeline
        .views()
        .names()
        .into_iter()
        .map(String::from)
        .collect();
    let mut state = AppState::new(
        action_tx.clone(),
        config.serial.clone(),
        config.scroll_window(),
        view_names,
    );
    refresh_ports(&mut state);

    if pipeline.views().contains(&config.default_view) {
        state.set_view(&config.default_view);
    } else {
        warn!(view = %config.default_view, "Unknown view, using {}", FULL_VIEW);
    }

    // Handle CLI port for direct connection
    if let Some(port) = &args.port {
        state.selected_port = Some(port.clone());
        state.navigate_to(Screen::LogViewer);
        let _ = internal_tx.send(InternalAction::Connect(port.clone()));
    }

    // Initialize TUI
    let mut tui = Tui::new()?;

    // Initialize event handler
    let mut events = EventHandler::new(Duration::from_millis(100));

    // Initialize keybindings
    let keybindings = KeyBindings::new();

    // Initial render
    render(&mut tui, &mut state, &pipeline)?;

    // Main event loop
    loop {
        // Lines arrive faster than the screen needs repainting; those only mark
        // the state dirty and get drawn on the next tick
        let mut draw_now = true;

        tokio::select! {
            // Handle terminal events
            Some(event) = events.next() => {
                match event {
                    Event::Key(key) => {
                        // Any key acknowledges the current notification
                        state.dismiss_message();
                        let context = KeyContext::for_screen(&state.current_screen);
                        if let Some(action) = keybindings.get_action(context, &key) {
                            let _ = action_tx.send(action);
                        }
                        draw_now = false;
                    }
                    Event::Tick => {
                        let expired = state.tick();
                        draw_now = expired || state.render_dirty;
                    }
                    Event::Resize(_, _) => {}
                    Event::Error(e) => {
                        state.show_message(e);
                    }
                }
            }

            // Handle session output
            Some(event) = session_rx.recv() => {
                apply_session_event(&mut state, &pipeline, event);
                draw_now = false;
            }

            // Handle user actions
            Some(action) = action_rx.recv() => {
                handle_action(&mut state, &internal_tx, &pipeline, action);
            }

            // Handle internal async actions
            Some(internal) = internal_rx.recv() => {
                match internal {
                    InternalAction::Connect(port) => {
                        // Drain the old connection first so its flushed tail is
                        // not dropped as stale once the new id is active
                        session.disconnect().await;
                        while let Ok(event) = session_rx.try_recv() {
                            apply_session_event(&mut state, &pipeline, event);
                        }

                        state.selected_port = Some(port.clone());
                        let id = session.connect(&port, &state.settings, session_tx.clone()).await;
                        pipeline.set_active_connection(id);
                        info!(port = %port, connection = id, "Session started");
                    }
                    InternalAction::Disconnect => {
                        session.disconnect().await;
                    }
                }
            }
        }

        if state.should_quit {
            break;
        }

        if draw_now {
            state.refresh(&pipeline);
            render(&mut tui, &mut state, &pipeline)?;
        }
    }

    // Cleanup
    session.disconnect().await;
    events.shutdown();
    tui.restore()?;

    Ok(())
}

fn apply_session_event(state: &mut AppState, pipeline: &Pipeline, event: SessionEvent) {
    let Some(update) = pipeline.handle_event(event) else {
        return;
    };

    if let PipelineUpdate::Status { address, status } = update {
        match &status {
            ConnectionStatus::Error(msg) => {
                state.show_message(format!("{}: {}", address, msg));
            }
            ConnectionStatus::Connected => {
                state.show_message(format!("Connected to {}", address));
            }
            _ => {}
        }
        state.status = status;
    }
    state.render_dirty = true;
}

fn refresh_ports(state: &mut AppState) {
    match available_ports() {
        Ok(ports) => {
            state.ports = ports;
            state.ui_state.list_state.select(Some(0));
        }
        Err(e) => {
            warn!(error = %e, "Port enumeration failed");
            state.show_message(format!("Failed to list ports: {}", e));
        }
    }
}

fn handle_action(
    state: &mut AppState,
    internal_tx: &mpsc::UnboundedSender<InternalAction>,
    pipeline: &Pipeline,
    action: Action,
) {
    match action {
        Action::Quit => {
            let _ = internal_tx.send(InternalAction::Disconnect);
            state.should_quit = true;
        }
        Action::GoBack => {
            if state.ui_state.help_visible {
                state.ui_state.help_visible = false;
                return;
            }
            // Leaving the log viewer closes the port
            if state.current_screen == Screen::LogViewer {
                let _ = internal_tx.send(InternalAction::Disconnect);
            }
            if !state.go_back() {
                state.should_quit = true;
            }
        }
        Action::Navigate(Screen::PortSelect) => {
            let _ = internal_tx.send(InternalAction::Disconnect);
            state.screen_stack.clear();
            state.current_screen = Screen::PortSelect;
            state.ui_state.list_state.select(Some(0));
        }
        Action::Navigate(screen) => {
            state.navigate_to(screen);
        }
        Action::ListUp => {
            state.list_up();
        }
        Action::ListDown => {
            state.list_down();
        }
        Action::ListSelect => {
            handle_list_select(state);
        }
        Action::SelectPort(name) => {
            if state.current_screen == Screen::PortSelect {
                state.navigate_to(Screen::LogViewer);
            }
            let _ = internal_tx.send(InternalAction::Connect(name));
        }
        Action::SelectView(name) => {
            state.set_view(&name);
            if state.current_screen == Screen::ViewSelect {
                state.go_back();
            }
        }
        Action::JumpToError(index) => {
            if !state.jump_to_error(index, pipeline) {
                state.show_message("Source line is no longer in the log".to_string());
            }
        }

        Action::RefreshPorts => {
            refresh_ports(state);
        }
        Action::Reconnect => match state.selected_port.clone() {
            Some(port) => {
                let _ = internal_tx.send(InternalAction::Connect(port));
            }
            None => state.show_message("No port selected".to_string()),
        },
        Action::Disconnect => {
            if state.status.is_connected() || state.status == ConnectionStatus::Connecting {
                let _ = internal_tx.send(InternalAction::Disconnect);
            } else {
                state.show_message("Not connected".to_string());
            }
        }

        // Log viewer actions
        Action::ScrollUp(n) => {
            state.scroll_up(n);
        }
        Action::ScrollDown(n) => {
            state.scroll_down(n);
        }
        Action::PageUp => {
            state.page_up();
        }
        Action::PageDown => {
            state.page_down();
        }
        Action::ScrollToTop => {
            state.scroll_to_top();
        }
        Action::ScrollToBottom => {
            state.scroll_to_bottom();
        }
        Action::ToggleAutoScroll => {
            state.toggle_follow();
        }
        Action::ToggleTimestamps => {
            state.ui_state.show_timestamps = !state.ui_state.show_timestamps;
        }
        Action::ToggleLocalTime => {
            state.ui_state.use_local_time = !state.ui_state.use_local_time;
        }
        Action::NextView => {
            let next = pipeline.views().next_name(&state.active_view).to_string();
            state.set_view(&next);
        }
        Action::PrevView => {
            let prev = pipeline.views().prev_name(&state.active_view).to_string();
            state.set_view(&prev);
        }
        Action::OpenViewPicker => {
            let current = state
                .view_names
                .iter()
                .position(|name| *name == state.active_view)
                .unwrap_or(0);
            state.navigate_to(Screen::ViewSelect);
            state.ui_state.list_state.select(Some(current));
        }
        Action::OpenErrorLog => {
            state.refresh(pipeline);
            let newest = state.errors.len().saturating_sub(1);
            state.navigate_to(Screen::ErrorLog);
            state.ui_state.list_state.select(Some(newest));
        }
        Action::ClearLogs => {
            pipeline.clear();
            state.clear_logs();
            state.show_message("Log cleared".to_string());
        }
        Action::ExportLogs => {
            let filename = export_filename(&state.active_view, "log");
            match pipeline.export_view(&state.active_view, Path::new(&filename)) {
                Ok(count) => {
                    state.show_message(format!("Exported {} lines to {}", count, filename));
                }
                Err(e) => {
                    state.show_message(format!("Export failed: {}", e));
                }
            }
        }
        Action::ExportErrors => {
            let filename = export_filename("errors", "log");
            let records = pipeline.index().errors();
            let content = export_errors(&records, |seq| pipeline.index().line(seq));
            match fs::write(&filename, content) {
                Ok(()) => {
                    state.show_message(format!(
                        "Exported {} errors to {}",
                        records.len(),
                        filename
                    ));
                }
                Err(e) => {
                    state.show_message(format!("Export failed: {}", e));
                }
            }
        }

        Action::ToggleHelp => {
            state.ui_state.help_visible = !state.ui_state.help_visible;
        }
    }

    state.render_dirty = true;
}

fn handle_list_select(state: &mut AppState) {
    let Some(idx) = state.selected_index() else {
        return;
    };

    match state.current_screen {
        Screen::PortSelect => {
            if let Some(port) = state.ports.get(idx) {
                let name = port.name.clone();
                let _ = state.action_tx.send(Action::SelectPort(name));
            }
        }
        Screen::ViewSelect => {
            if let Some(name) = state.view_names.get(idx) {
                let name = name.clone();
                let _ = state.action_tx.send(Action::SelectView(name));
            }
        }
        Screen::ErrorLog => {
            if idx < state.errors.len() {
                let _ = state.action_tx.send(Action::JumpToError(idx));
            }
        }
        Screen::LogViewer => {}
    }
}

fn export_filename(label: &str, extension: &str) -> String {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let label: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("serialscope_{}_{}.{}", label, timestamp, extension)
}

fn render(tui: &mut Tui, state: &mut AppState, pipeline: &Pipeline) -> Result<()> {
    tui.terminal().draw(|frame| {
        match state.current_screen {
            Screen::PortSelect => {
                PortSelectScreen::render(frame, state);
            }
            Screen::LogViewer => {
                LogViewerScreen::render(frame, state, pipeline);
            }
            Screen::ViewSelect => {
                ViewSelectScreen::render(frame, state, pipeline);
            }
            Screen::ErrorLog => {
                ErrorLogScreen::render(frame, state, pipeline);
            }
        }

        if state.ui_state.help_visible {
            HelpOverlay::render(frame);
        }
    })?;

    state.render_dirty = false;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides() {
        let args = Args::parse_from([
            "serialscope",
            "/dev/ttyUSB0",
            "--baud",
            "9600",
            "--data-bits",
            "7",
            "--parity",
            "even",
            "--stop-bits",
            "2",
        ]);
        assert_eq!(args.port.as_deref(), Some("/dev/ttyUSB0"));

        let mut config = AppConfig::default();
        config.apply(args.overrides());
        assert_eq!(config.serial.summary(), "9600 7E2");
    }

    #[test]
    fn test_data_bits_out_of_range_rejected() {
        let result = Args::try_parse_from(["serialscope", "--data-bits", "9"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_disconnect_needs_open_port() {
        let (action_tx, _action_rx) = mpsc::unbounded_channel();
        let (internal_tx, mut internal_rx) = mpsc::unbounded_channel();
        let pipeline = Pipeline::default();
        let config = AppConfig::default();
        let mut state = AppState::new(
            action_tx,
            config.serial.clone(),
            config.scroll_window(),
            vec![FULL_VIEW.to_string()],
        );

        handle_action(&mut state, &internal_tx, &pipeline, Action::Disconnect);
        assert!(internal_rx.try_recv().is_err());
        assert_eq!(state.ui_state.message.as_deref(), Some("Not connected"));

        state.status = ConnectionStatus::Connected;
        handle_action(&mut state, &internal_tx, &pipeline, Action::Disconnect);
        assert!(matches!(
            internal_rx.try_recv(),
            Ok(InternalAction::Disconnect)
        ));
    }

    #[test]
    fn test_export_filename_sanitized() {
        let name = export_filename("my view/1", "log");
        assert!(name.starts_with("serialscope_my_view_1_"));
        assert!(name.ends_with(".log"));
    }
}
