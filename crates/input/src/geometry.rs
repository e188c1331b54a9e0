//! Coordinate spaces for cursor queries and event injection.
//!
//! macOS answers cursor queries in Cocoa coordinates (origin at the
//! bottom-left of the primary display, y grows upward) but injects events
//! in Quartz coordinates (origin at the top-left, y grows downward). The
//! two are related by a vertical flip anchored at the primary display's
//! height. Keeping the spaces as distinct types means a raw sample can
//! never reach the injection API without going through
//! [`NativePoint::to_injected`].

/// A point in cursor-query (Cocoa) space: origin bottom-left, y up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativePoint {
    pub x: f64,
    pub y: f64,
}

/// A point in event-injection (Quartz) space: origin top-left, y down.
///
/// One `InjectedPoint` value is sampled and converted per click and handed
/// to both the press and the release emission, which is what guarantees the
/// two events of a pair carry bit-identical coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InjectedPoint {
    pub x: f64,
    pub y: f64,
}

impl NativePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Convert to injection space by flipping the vertical axis around the
    /// primary display's height.
    pub fn to_injected(self, display_height: f64) -> InjectedPoint {
        InjectedPoint {
            x: self.x,
            y: display_height - self.y,
        }
    }
}

impl InjectedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
