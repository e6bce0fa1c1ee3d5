//! Inbound adapters that turn watched resource changes into reconciliations.
//!
//! [`watch`] decodes the event stream, [`events`] defines the events and the
//! admission filter, and [`controller`] keeps the informer cache current and
//! dispatches reconciliations.

pub mod controller;
pub mod events;
pub mod watch;

pub use controller::{Controller, ControllerConfig, ControllerError};
pub use events::{ResourceEvent, admits};
pub use watch::{
    WatchError, WatchEventError, WatchSummary, decode_watch_event, read_watch_events,
};
