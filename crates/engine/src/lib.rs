//! Click automation engine for tappet.
//!
//! The engine is a timer-driven state machine: given a configuration
//! snapshot it waits out a start delay, then repeatedly synthesizes
//! press/release pairs at the current cursor position until the run's
//! duration budget expires or the caller stops it. Input-injection
//! authorization is re-checked before every privileged step and its
//! absence halts the run instead of raising an error.
//!
//! The presentation layer owns neither component: it hands the engine a
//! [`ClickSettings`] snapshot via [`AutomationEngine::start`] and observes
//! the published [`EngineStatus`] stream via
//! [`AutomationEngine::subscribe`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tappet_engine::{AutomationEngine, ClickSettings};
//! use tappet_input::{SystemPermissionGate, SystemPointer};
//!
//! let engine = AutomationEngine::spawn(Arc::new(SystemPermissionGate), Arc::new(SystemPointer));
//! engine.start(ClickSettings::default());
//! let mut status = engine.subscribe();
//! while status.changed().await.is_ok() {
//!     println!("{:?}", *status.borrow());
//! }
//! ```

mod engine;
mod settings;
mod state;

pub use engine::AutomationEngine;
pub use settings::{ClickSettings, MIN_CLICK_DWELL, MIN_CLICK_INTERVAL};
pub use state::{EngineStatus, Phase};
