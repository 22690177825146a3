//! Message envelopes for the Live API bidirectional streaming protocol.
pub mod content;
pub mod events;
pub mod setup;

//re-export types for easier access
pub use content::{Blob, Content, Part};
pub use events::{ClientMessage, ServerEvent, ServerMessage};
pub use setup::{ResponseModality, Setup};
