//! Dispatch layer: turns inbound frames into registry updates and fan-out.

pub mod dispatcher;

pub use dispatcher::{DispatchOutcome, Dispatcher, FanOutReport, SharedRegistry};
