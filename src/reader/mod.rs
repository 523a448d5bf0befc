//! XML Reader Module
//!
//! - SliceReader: zero-copy pull parser over a byte slice
//! - Events: event types produced by the reader

pub mod events;
pub mod slice;

pub use events::{EndElement, StartElement, XmlEvent};
pub use slice::SliceReader;
