//! ResourceArc Wrappers
//!
//! Persistent state for BEAM-side transcoders and parsed documents. Each
//! resource serializes access through a `Mutex`.

use std::io;
use std::sync::Mutex;

use rustler::ResourceArc;

use crate::atom::register_namespaces;
use crate::codec::{Encoding, TranscodeState, Transcoder};
use crate::dom::XmlDocument;
use crate::xpath::XPathContext;

/// Transcoder state between NIF calls; output goes to a fresh buffer per call
pub struct TranscoderResource {
    state: Mutex<TranscodeState>,
}

impl TranscoderResource {
    pub fn new(encoding: &str) -> Self {
        TranscoderResource {
            state: Mutex::new(TranscodeState::new(Encoding::from_name(encoding))),
        }
    }

    /// Run one transcoder operation and return the bytes it produced
    ///
    /// # Errors
    ///
    /// Returns `"mutex_poisoned"` if a previous call panicked.
    pub fn run<F>(&self, op: F) -> Result<Vec<u8>, &'static str>
    where
        F: FnOnce(&mut Transcoder<'_>) -> io::Result<()>,
    {
        let mut state = self.state.lock().map_err(|_| "mutex_poisoned")?;
        let mut out = Vec::new();
        let mut transcoder = Transcoder::resume(&mut out, *state);
        // Buffer sinks cannot fail
        let _ = op(&mut transcoder);
        *state = transcoder.into_state();
        Ok(out)
    }
}

#[rustler::resource_impl]
impl rustler::Resource for TranscoderResource {}

pub type TranscoderRef = ResourceArc<TranscoderResource>;

struct DocumentState {
    doc: XmlDocument,
    xpath: XPathContext,
}

/// A parsed document with its own AtomPub-bound XPath context
pub struct DocumentResource {
    inner: Mutex<DocumentState>,
}

impl DocumentResource {
    pub fn new(doc: XmlDocument) -> Self {
        let mut xpath = XPathContext::new();
        register_namespaces(&mut xpath);
        DocumentResource {
            inner: Mutex::new(DocumentState { doc, xpath }),
        }
    }

    /// # Errors
    ///
    /// Returns `"mutex_poisoned"` if a previous call panicked.
    pub fn with_document<F, R>(&self, f: F) -> Result<R, &'static str>
    where
        F: FnOnce(&mut XPathContext, &XmlDocument) -> R,
    {
        let mut guard = self.inner.lock().map_err(|_| "mutex_poisoned")?;
        let DocumentState { doc, xpath } = &mut *guard;
        Ok(f(xpath, doc))
    }
}

#[rustler::resource_impl]
impl rustler::Resource for DocumentResource {}

pub type DocumentRef = ResourceArc<DocumentResource>;
