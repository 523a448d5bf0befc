//! Core XML primitives
//!
//! Byte-level building blocks shared by the reader and the DOM:
//! - Entities: reference decoding with Cow (zero-copy when possible) and
//!   escaping for serialization
//! - Attributes: attribute list parsing, name classes, qualified names

pub mod attributes;
pub mod entities;
