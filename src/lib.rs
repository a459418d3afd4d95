//! emuhost: emulation thread scheduling and input translation for emulator frontends.
//!
//! Runs an opaque [`Machine`] on a dedicated thread with run / single-step / idle / stop
//! control, hands an exclusive [`GraphicsContext`] between the presentation and emulation
//! threads, and turns keyboard and controller input into logical key presses.

pub mod axis;
pub mod backends;
pub mod binding;
pub mod config;
pub mod context;
pub mod device;
pub mod error;
pub mod event;
pub mod eventbus;
pub mod filtered_listener;
pub mod logger;
pub mod machine;
pub mod manager;
pub mod scheduler;
pub mod shell;

pub use axis::*;
pub use binding::*;
pub use config::{InputSettings, KeyMapping, Settings};
pub use context::*;
pub use device::*;
pub use error::*;
pub use event::*;
pub use eventbus::*;
pub use filtered_listener::FilteredListener;
pub use logger::Logger;
pub use machine::*;
pub use manager::*;
pub use scheduler::{Notification, RunState, SchedulerHandle};
pub use shell::*;
