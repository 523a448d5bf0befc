//! cmisatom - AtomPub/CMIS wire helpers
//!
//! Components:
//! - `codec`: streaming base64 transcoder with resumable state and
//!   pluggable sinks
//! - `reader` / `dom`: pull reader and arena DOM with namespaces, mutation
//!   and serialization
//! - `xpath`: XPath 1.0 subset with namespace-aware name tests and a
//!   compiled-expression cache
//! - `atom`: namespace table, lenient value extraction, entry promotion
//! - `session`: typed boundary to an external CMIS session factory
//!
//! The library installs no tracing subscriber. Enable the `nif` feature for
//! the BEAM bindings.

pub mod atom;
pub mod codec;
pub mod core;
pub mod dom;
pub mod error;
pub mod reader;
pub mod session;
pub mod xpath;

#[cfg(feature = "nif")]
mod nif;
#[cfg(feature = "nif")]
mod resource;
#[cfg(feature = "nif")]
mod term;

pub use atom::{get_xpath_value, get_xpath_values, register_namespaces, wrap_in_doc};
pub use codec::{Encoding, Sink, TranscodeState, Transcoder};
pub use dom::{NodeId, XmlDocument};
pub use error::{Error, Result, XPathError, XmlError};
pub use session::{SessionError, SessionFactory, SessionParam, SessionParams};
pub use xpath::{XPathContext, XPathValue};
