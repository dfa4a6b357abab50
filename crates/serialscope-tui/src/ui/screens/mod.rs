mod error_log;
mod log_viewer;
mod port_select;
mod view_select;

pub use error_log::ErrorLogScreen;
pub use log_viewer::LogViewerScreen;
pub use port_select::PortSelectScreen;
pub use view_select::ViewSelectScreen;
