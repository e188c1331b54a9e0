//! Pointer-event injection for tappet.
//!
//! Provides the two platform seams the automation engine drives:
//!
//! - [`PermissionGate`]: can this process synthesize input events right now?
//! - [`PointerDevice`]: sample the cursor, query display metrics, and emit
//!   press/release events at an explicit coordinate.
//!
//! Both are traits so the engine can be exercised with in-memory fakes.
//! The `System*` implementations target macOS, where input synthesis
//! requires the Accessibility permission and the cursor-query and
//! event-injection APIs disagree about where the origin of the screen is
//! (see [`NativePoint`] and [`InjectedPoint`]).
//!
//! # Example
//!
//! ```ignore
//! use tappet_input::{PermissionGate, PointerDevice, SystemPermissionGate, SystemPointer};
//!
//! let gate = SystemPermissionGate;
//! if gate.is_authorized() {
//!     let pointer = SystemPointer;
//!     if let (Some(at), Some(height)) = (pointer.cursor_position(), pointer.display_height()) {
//!         let at = at.to_injected(height);
//!         pointer.press(at)?;
//!         // ... dwell ...
//!         pointer.release(at)?;
//!     }
//! }
//! ```

mod error;
mod geometry;

#[cfg(target_os = "macos")]
mod macos;

pub use error::PointerError;
pub use geometry::{InjectedPoint, NativePoint};

/// Authorization probe for input synthesis.
///
/// Authorization is a boolean condition, not an error: callers branch on
/// [`is_authorized`](PermissionGate::is_authorized) before every privileged
/// operation. A prior `true` must never be cached: on macOS the user can
/// revoke Accessibility access while the process is running.
pub trait PermissionGate: Send + Sync {
    /// Whether the process may synthesize input events right now.
    ///
    /// Must not prompt the user.
    fn is_authorized(&self) -> bool;

    /// Trigger the platform authorization flow.
    ///
    /// Safe to call repeatedly. Not guaranteed to be synchronous: on macOS
    /// this registers the process in the Accessibility list and shows the
    /// system prompt, but access only becomes true after the user flips the
    /// toggle in System Settings.
    fn request_authorization(&self);
}

/// Cursor sampling and synthetic mouse-event emission.
///
/// Queries answer in native (cursor-query) space; emission takes a point
/// already converted to injection space. Query methods return `None` when
/// the platform cannot answer; the caller is expected to skip that click
/// and carry on.
pub trait PointerDevice: Send + Sync {
    /// Current pointer position in native space.
    fn cursor_position(&self) -> Option<NativePoint>;

    /// Height of the primary display, for the native-to-injected flip.
    fn display_height(&self) -> Option<f64>;

    /// Emit a left-button press at the given injected-space point.
    fn press(&self, at: InjectedPoint) -> Result<(), PointerError>;

    /// Emit a left-button release at the given injected-space point.
    fn release(&self, at: InjectedPoint) -> Result<(), PointerError>;
}

/// [`PermissionGate`] backed by the platform's accessibility trust check.
///
/// On non-macOS targets the probe always succeeds and the request is a
/// no-op; input synthesis itself is only implemented for macOS.
pub struct SystemPermissionGate;

impl PermissionGate for SystemPermissionGate {
    fn is_authorized(&self) -> bool {
        #[cfg(target_os = "macos")]
        {
            macos::is_process_trusted()
        }
        #[cfg(not(target_os = "macos"))]
        {
            true
        }
    }

    fn request_authorization(&self) {
        #[cfg(target_os = "macos")]
        {
            macos::prompt_process_trust();
        }
    }
}

/// [`PointerDevice`] backed by the platform's event-injection APIs.
pub struct SystemPointer;

impl PointerDevice for SystemPointer {
    fn cursor_position(&self) -> Option<NativePoint> {
        #[cfg(target_os = "macos")]
        {
            macos::cursor_position()
        }
        #[cfg(not(target_os = "macos"))]
        {
            None
        }
    }

    fn display_height(&self) -> Option<f64> {
        #[cfg(target_os = "macos")]
        {
            macos::main_display_height()
        }
        #[cfg(not(target_os = "macos"))]
        {
            None
        }
    }

    fn press(&self, at: InjectedPoint) -> Result<(), PointerError> {
        #[cfg(target_os = "macos")]
        {
            macos::post_press(at)
        }
        #[cfg(not(target_os = "macos"))]
        {
            let _ = at;
            Err(PointerError::Unsupported)
        }
    }

    fn release(&self, at: InjectedPoint) -> Result<(), PointerError> {
        #[cfg(target_os = "macos")]
        {
            macos::post_release(at)
        }
        #[cfg(not(target_os = "macos"))]
        {
            let _ = at;
            Err(PointerError::Unsupported)
        }
    }
}

/// Open the system settings page where the user grants input-injection
/// access (the Accessibility pane on macOS).
///
/// The decision to offer this belongs to the presentation layer; the
/// engine itself only ever probes and requests.
pub fn open_accessibility_settings() {
    #[cfg(target_os = "macos")]
    {
        macos::open_accessibility_settings();
    }
}
