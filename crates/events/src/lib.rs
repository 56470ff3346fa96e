//! Domain events and their stream envelopes.

mod envelope;
mod event;

pub use envelope::EventEnvelope;
pub use event::Event;
