//! BEAM bindings
//!
//! One-shot base64, a resumable transcoder resource, and parsed-document
//! resources with AtomPub extraction.

use rustler::{Binary, Env, NifResult, ResourceArc, Term};

use crate::atom::{get_xpath_value, wrap_in_doc};
use crate::codec::{self, BASE64};
use crate::dom::XmlDocument;
use crate::resource::{DocumentRef, DocumentResource, TranscoderRef, TranscoderResource};
use crate::term::{bytes_to_binary, error_tuple, ok_tuple};
use crate::xpath::XPathValue;

fn nif_error(reason: &'static str) -> rustler::Error {
    rustler::Error::Term(Box::new(reason))
}

// ============================================================================
// Base64
// ============================================================================

#[rustler::nif]
fn base64_encode<'a>(env: Env<'a>, input: Binary<'a>) -> Term<'a> {
    bytes_to_binary(env, &codec::encode_to_vec(BASE64, input.as_slice()))
}

#[rustler::nif]
fn base64_decode<'a>(env: Env<'a>, input: Binary<'a>) -> Term<'a> {
    bytes_to_binary(env, &codec::decode_to_vec(BASE64, input.as_slice()))
}

// ============================================================================
// Streaming transcoder
// ============================================================================

#[rustler::nif]
fn transcoder_new(encoding: &str) -> TranscoderRef {
    ResourceArc::new(TranscoderResource::new(encoding))
}

#[rustler::nif]
fn transcoder_encode<'a>(env: Env<'a>, transcoder: TranscoderRef, input: Binary<'a>) -> NifResult<Term<'a>> {
    let out = transcoder
        .run(|t| t.encode(input.as_slice()))
        .map_err(nif_error)?;
    Ok(bytes_to_binary(env, &out))
}

#[rustler::nif]
fn transcoder_decode<'a>(env: Env<'a>, transcoder: TranscoderRef, input: Binary<'a>) -> NifResult<Term<'a>> {
    let out = transcoder
        .run(|t| t.decode(input.as_slice()))
        .map_err(nif_error)?;
    Ok(bytes_to_binary(env, &out))
}

#[rustler::nif]
fn transcoder_finish<'a>(env: Env<'a>, transcoder: TranscoderRef) -> NifResult<Term<'a>> {
    let out = transcoder.run(|t| t.finish()).map_err(nif_error)?;
    Ok(bytes_to_binary(env, &out))
}

// ============================================================================
// Documents
// ============================================================================

/// Lenient parse, never fails
#[rustler::nif(schedule = "DirtyCpu")]
fn parse(input: Binary) -> DocumentRef {
    ResourceArc::new(DocumentResource::new(XmlDocument::parse(input.as_slice())))
}

/// `{:ok, doc}` or `{:error, reason}`
#[rustler::nif(schedule = "DirtyCpu")]
fn parse_strict<'a>(env: Env<'a>, input: Binary<'a>) -> Term<'a> {
    match XmlDocument::parse_strict(input.as_slice()) {
        Ok(doc) => ok_tuple(env, ResourceArc::new(DocumentResource::new(doc))),
        Err(err) => error_tuple(env, err.to_string()),
    }
}

#[rustler::nif]
fn xpath_value(doc: DocumentRef, expr: &str) -> NifResult<String> {
    doc.with_document(|ctx, doc| get_xpath_value(ctx, doc, expr))
        .map_err(nif_error)
}

/// Promote the first element selected by `expr` to its own document
#[rustler::nif(name = "wrap_in_doc")]
fn promote(doc: DocumentRef, expr: &str) -> NifResult<DocumentRef> {
    let promoted = doc
        .with_document(|ctx, doc| {
            let first = match ctx.evaluate(doc, expr) {
                Ok(XPathValue::NodeSet(nodes)) => nodes.first().and_then(|n| n.node_id()),
                _ => None,
            };
            match first {
                Some(node) => wrap_in_doc(doc, node),
                None => XmlDocument::new(),
            }
        })
        .map_err(nif_error)?;
    Ok(ResourceArc::new(DocumentResource::new(promoted)))
}

#[rustler::nif]
fn to_xml(doc: DocumentRef) -> NifResult<String> {
    doc.with_document(|_, doc| doc.to_xml()).map_err(nif_error)
}

rustler::init!("Elixir.CmisAtom.Native");
