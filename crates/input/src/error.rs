//! Error types for pointer-event injection.

use thiserror::Error;

/// Errors that can occur while synthesizing a pointer event.
///
/// These never abort a run: the automation engine logs them and skips the
/// affected click.
#[derive(Debug, Error)]
pub enum PointerError {
    /// Failed to create the HID-state event source.
    #[error("failed to create HID event source")]
    EventSource,

    /// Failed to construct a mouse event.
    #[error("failed to construct {0} event")]
    EventConstruction(&'static str),

    /// Input injection is not implemented for this platform.
    #[error("input injection is not supported on this platform")]
    Unsupported,
}
