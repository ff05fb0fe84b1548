//! General helpers that don't belong to a single domain module.

pub mod event_stream;

pub use event_stream::{EventStream, EventStreamData};
