//! Built-in listeners.

#[cfg(feature = "logging")]
mod log;
mod report;

#[cfg(feature = "logging")]
pub use log::LogListener;
pub use report::ReportListener;
