//! Countdown tracking for long-running upgrade tasks.
//!
//! The [`engine`] drives tasks from creation through due notification,
//! completion, recurrence and soft deletion; [`app::Tracker`] wires it to a
//! store, a notifier, a clock and a locale.

pub mod app;
pub mod clock;
pub mod domain;
pub mod engine;
pub mod locale;
pub mod notifications;
pub mod persistence;
pub mod ticker;
