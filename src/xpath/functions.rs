//! XPath Functions
//!
//! Core library subset: node-set, string, boolean and number functions.
//! Names and argument counts are checked when an expression is compiled.

use super::eval::EvalContext;
use super::value::{parse_number, XPathNode, XPathValue};
use crate::dom::XmlDocument;
use crate::error::XPathError;

/// Supported functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Position,
    Last,
    Count,
    LocalName,
    NamespaceUri,
    Name,
    String,
    Concat,
    StartsWith,
    Contains,
    StringLength,
    NormalizeSpace,
    Boolean,
    Not,
    True,
    False,
    Number,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "position" => Function::Position,
            "last" => Function::Last,
            "count" => Function::Count,
            "local-name" => Function::LocalName,
            "namespace-uri" => Function::NamespaceUri,
            "name" => Function::Name,
            "string" => Function::String,
            "concat" => Function::Concat,
            "starts-with" => Function::StartsWith,
            "contains" => Function::Contains,
            "string-length" => Function::StringLength,
            "normalize-space" => Function::NormalizeSpace,
            "boolean" => Function::Boolean,
            "not" => Function::Not,
            "true" => Function::True,
            "false" => Function::False,
            "number" => Function::Number,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Position => "position",
            Function::Last => "last",
            Function::Count => "count",
            Function::LocalName => "local-name",
            Function::NamespaceUri => "namespace-uri",
            Function::Name => "name",
            Function::String => "string",
            Function::Concat => "concat",
            Function::StartsWith => "starts-with",
            Function::Contains => "contains",
            Function::StringLength => "string-length",
            Function::NormalizeSpace => "normalize-space",
            Function::Boolean => "boolean",
            Function::Not => "not",
            Function::True => "true",
            Function::False => "false",
            Function::Number => "number",
        }
    }

    /// Reject a call with the wrong number of arguments
    pub fn check_arity(self, argc: usize) -> Result<(), XPathError> {
        let (min, max, message) = match self {
            Function::Position | Function::Last | Function::True | Function::False => {
                (0, Some(0), "takes no arguments")
            }
            Function::Count | Function::Boolean | Function::Not => (1, Some(1), "requires exactly 1 argument"),
            Function::LocalName
            | Function::NamespaceUri
            | Function::Name
            | Function::String
            | Function::StringLength
            | Function::NormalizeSpace
            | Function::Number => (0, Some(1), "takes at most 1 argument"),
            Function::StartsWith | Function::Contains => (2, Some(2), "requires exactly 2 arguments"),
            Function::Concat => (2, None, "requires at least 2 arguments"),
        };
        if argc < min || max.is_some_and(|max| argc > max) {
            return Err(XPathError::Argument {
                function: self.name(),
                message,
            });
        }
        Ok(())
    }
}

/// Call a function with evaluated arguments
pub fn call(
    function: Function,
    args: Vec<XPathValue>,
    ctx: &EvalContext,
    doc: &XmlDocument,
) -> Result<XPathValue, XPathError> {
    let mut args = args.into_iter();
    let value = match function {
        Function::Position => XPathValue::Number(ctx.position as f64),
        Function::Last => XPathValue::Number(ctx.size as f64),
        Function::Count => {
            let nodes = nodeset_arg(function, args.next())?;
            XPathValue::Number(nodes.len() as f64)
        }
        Function::LocalName => {
            let node = optional_node(function, args.next(), ctx)?;
            XPathValue::String(node.map(|n| n.local_name(doc).to_string()).unwrap_or_default())
        }
        Function::NamespaceUri => {
            let node = optional_node(function, args.next(), ctx)?;
            XPathValue::String(node.map(|n| n.namespace_uri(doc).to_string()).unwrap_or_default())
        }
        Function::Name => {
            let node = optional_node(function, args.next(), ctx)?;
            XPathValue::String(node.map(|n| n.name(doc).to_string()).unwrap_or_default())
        }
        Function::String => XPathValue::String(string_arg(args.next(), ctx, doc)),
        Function::Concat => XPathValue::String(args.map(|a| a.to_string_value(doc)).collect()),
        Function::StartsWith => {
            let (haystack, needle) = two_strings(args, doc);
            XPathValue::Boolean(haystack.starts_with(&needle))
        }
        Function::Contains => {
            let (haystack, needle) = two_strings(args, doc);
            XPathValue::Boolean(haystack.contains(&needle))
        }
        Function::StringLength => {
            XPathValue::Number(string_arg(args.next(), ctx, doc).chars().count() as f64)
        }
        Function::NormalizeSpace => {
            let s = string_arg(args.next(), ctx, doc);
            XPathValue::String(normalize_space(&s))
        }
        Function::Boolean => XPathValue::Boolean(args.next().is_some_and(|a| a.to_boolean())),
        Function::Not => XPathValue::Boolean(!args.next().is_some_and(|a| a.to_boolean())),
        Function::True => XPathValue::Boolean(true),
        Function::False => XPathValue::Boolean(false),
        Function::Number => XPathValue::Number(match args.next() {
            Some(arg) => arg.to_number(doc),
            None => parse_number(&ctx.node.string_value(doc)),
        }),
    };
    Ok(value)
}

fn nodeset_arg(function: Function, arg: Option<XPathValue>) -> Result<Vec<XPathNode>, XPathError> {
    arg.and_then(XPathValue::into_nodeset)
        .ok_or(XPathError::Argument {
            function: function.name(),
            message: "requires a node-set argument",
        })
}

/// First node of the argument in document order, or the context node
fn optional_node(
    function: Function,
    arg: Option<XPathValue>,
    ctx: &EvalContext,
) -> Result<Option<XPathNode>, XPathError> {
    match arg {
        None => Ok(Some(ctx.node)),
        Some(value) => Ok(nodeset_arg(function, Some(value))?.first().copied()),
    }
}

fn string_arg(arg: Option<XPathValue>, ctx: &EvalContext, doc: &XmlDocument) -> String {
    match arg {
        Some(value) => value.to_string_value(doc),
        None => ctx.node.string_value(doc),
    }
}

fn two_strings(mut args: impl Iterator<Item = XPathValue>, doc: &XmlDocument) -> (String, String) {
    let first = args.next().map(|a| a.to_string_value(doc)).unwrap_or_default();
    let second = args.next().map(|a| a.to_string_value(doc)).unwrap_or_default();
    (first, second)
}

/// Collapse XPath whitespace runs to one space and trim the ends
pub fn normalize_space(s: &str) -> String {
    s.split([' ', '\t', '\n', '\r'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
