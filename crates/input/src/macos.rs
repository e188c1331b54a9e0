//! macOS bindings: accessibility trust and Quartz event injection.
//!
//! Event synthesis goes through `CGEventPost` at the HID tap, which
//! silently drops events unless the process is trusted for Accessibility.
//! The cursor is sampled with `NSEvent.mouseLocation` (Cocoa space,
//! bottom-left origin); injected events carry Quartz coordinates (top-left
//! origin), so callers convert through `NativePoint::to_injected` first.

use std::process::Command;

use core_foundation::base::TCFType;
use core_foundation::boolean::CFBoolean;
use core_foundation::dictionary::{CFDictionary, CFDictionaryRef};
use core_foundation::string::CFString;
use core_graphics::display::CGDisplay;
use core_graphics::event::{CGEvent, CGEventTapLocation, CGEventType, CGMouseButton};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use core_graphics::geometry::CGPoint;
use objc::{msg_send, sel, sel_impl, Encode};

use crate::error::PointerError;
use crate::geometry::{InjectedPoint, NativePoint};

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn AXIsProcessTrusted() -> bool;
    fn AXIsProcessTrustedWithOptions(options: CFDictionaryRef) -> bool;
}

// NSEvent lives in AppKit; without this the class lookup comes up empty.
#[link(name = "AppKit", kind = "framework")]
extern "C" {}

/// Cocoa's NSPoint, which shares CGPoint's layout on 64-bit targets.
#[repr(C)]
#[derive(Clone, Copy)]
struct NSPoint {
    x: f64,
    y: f64,
}

unsafe impl Encode for NSPoint {
    fn encode() -> objc::Encoding {
        let code = format!(
            "{{CGPoint={}{}}}",
            f64::encode().as_str(),
            f64::encode().as_str()
        );
        unsafe { objc::Encoding::from_str(&code) }
    }
}

/// Non-prompting probe of the Accessibility trust state.
pub fn is_process_trusted() -> bool {
    unsafe { AXIsProcessTrusted() }
}

/// Ask the system to put this process in the Accessibility list and show
/// the grant prompt.
///
/// Also creates a throwaway HID event source, which nudges the permission
/// subsystem into registering the process even when the prompt is
/// suppressed. The call returns before the user acts; re-probe
/// [`is_process_trusted`] later.
pub fn prompt_process_trust() {
    let trusted = unsafe {
        let key = CFString::new("AXTrustedCheckOptionPrompt");
        let options = CFDictionary::from_CFType_pairs(&[(key, CFBoolean::true_value())]);
        AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef())
    };

    if !trusted {
        let _ = CGEventSource::new(CGEventSourceStateID::HIDSystemState);
        tracing::warn!("accessibility permission not granted; user prompt requested");
    }
}

/// Open System Settings on the Accessibility pane.
pub fn open_accessibility_settings() {
    let _ = Command::new("open")
        .arg("x-apple.systempreferences:com.apple.preference.security?Privacy_Accessibility")
        .spawn();
}

/// Current cursor position in Cocoa (bottom-left origin) space.
///
/// Returns `None` when the NSEvent class cannot be resolved (AppKit not
/// loaded, e.g. a stripped-down launch context).
pub fn cursor_position() -> Option<NativePoint> {
    let class = objc::runtime::Class::get("NSEvent")?;
    let location: NSPoint = unsafe { msg_send![class, mouseLocation] };
    Some(NativePoint::new(location.x, location.y))
}

/// Height of the primary display in points.
///
/// Returns `None` when the display reports no extent (headless session),
/// in which case the flip anchor is unknown and the click must be skipped.
pub fn main_display_height() -> Option<f64> {
    let height = CGDisplay::main().bounds().size.height;
    (height > 0.0).then_some(height)
}

/// Post a left-button press at the given Quartz-space point.
pub fn post_press(at: InjectedPoint) -> Result<(), PointerError> {
    post_mouse_event(CGEventType::LeftMouseDown, "press", at)
}

/// Post a left-button release at the given Quartz-space point.
pub fn post_release(at: InjectedPoint) -> Result<(), PointerError> {
    post_mouse_event(CGEventType::LeftMouseUp, "release", at)
}

fn post_mouse_event(
    event_type: CGEventType,
    label: &'static str,
    at: InjectedPoint,
) -> Result<(), PointerError> {
    let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
        .map_err(|_| PointerError::EventSource)?;

    let event = CGEvent::new_mouse_event(
        source,
        event_type,
        CGPoint::new(at.x, at.y),
        CGMouseButton::Left,
    )
    .map_err(|_| PointerError::EventConstruction(label))?;

    event.post(CGEventTapLocation::HID);
    Ok(())
}
