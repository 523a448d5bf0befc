//! Attribute Parsing
//!
//! Parses the attribute list of a start tag, the bytes between the element
//! name and the closing `>` or `/>`.

use super::entities::{decode_text, decode_text_strict};
use memchr::memchr;
use std::borrow::Cow;

/// A parsed attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    /// Qualified name as written
    pub name: &'a [u8],
    /// Normalized, entity-decoded value
    pub value: Cow<'a, [u8]>,
}

impl<'a> Attribute<'a> {
    pub fn new(name: &'a [u8], value: Cow<'a, [u8]>) -> Self {
        Attribute { name, value }
    }

    /// Prefix before the colon, if any
    pub fn prefix(&self) -> Option<&'a [u8]> {
        split_name(self.name).0
    }

    /// Name after the colon
    pub fn local_name(&self) -> &'a [u8] {
        split_name(self.name).1
    }

    /// The prefix this attribute declares, `Some(b"")` for a default
    /// namespace declaration, None when it is not a declaration
    pub fn declared_prefix(&self) -> Option<&'a [u8]> {
        match split_name(self.name) {
            (None, b"xmlns") => Some(b""),
            (Some(b"xmlns"), local) => Some(local),
            _ => None,
        }
    }

    pub fn name_str(&self) -> Option<&str> {
        std::str::from_utf8(self.name).ok()
    }

    pub fn value_str(&self) -> Option<&str> {
        std::str::from_utf8(self.value.as_ref()).ok()
    }
}

/// Split a qualified name at its first colon
#[inline]
pub fn split_name(name: &[u8]) -> (Option<&[u8]>, &[u8]) {
    match memchr(b':', name) {
        Some(pos) => (Some(&name[..pos]), &name[pos + 1..]),
        None => (None, name),
    }
}

/// Parse attributes, skipping anything malformed
pub fn parse_attributes(input: &[u8]) -> Vec<Attribute<'_>> {
    let mut attrs = Vec::new();
    // Lenient mode never reports
    let _ = scan_attributes(input, false, &mut attrs);
    attrs
}

/// Parse attributes, failing on the first malformed one
pub fn parse_attributes_strict(input: &[u8]) -> Result<Vec<Attribute<'_>>, &'static str> {
    let mut attrs = Vec::new();
    scan_attributes(input, true, &mut attrs)?;
    Ok(attrs)
}

fn scan_attributes<'a>(
    input: &'a [u8],
    strict: bool,
    attrs: &mut Vec<Attribute<'a>>,
) -> Result<(), &'static str> {
    let mut pos = 0;

    loop {
        let had_space = pos < input.len() && is_whitespace(input[pos]);
        pos = skip_whitespace(input, pos);
        if pos >= input.len() {
            return Ok(());
        }

        if !is_name_start_char(input[pos]) {
            if strict {
                return Err("Attribute name must start with a letter, underscore or colon");
            }
            pos += 1;
            continue;
        }
        if strict && !had_space && !attrs.is_empty() {
            return Err("Whitespace required between attributes");
        }

        let name_start = pos;
        while pos < input.len() && is_name_char(input[pos]) {
            pos += 1;
        }
        let name = &input[name_start..pos];

        pos = skip_whitespace(input, pos);
        if input.get(pos) != Some(&b'=') {
            if strict {
                return Err("Attribute value required");
            }
            attrs.push(Attribute::new(name, Cow::Borrowed(b"")));
            continue;
        }
        pos = skip_whitespace(input, pos + 1);

        let quote = match input.get(pos) {
            Some(&q) if q == b'"' || q == b'\'' => q,
            Some(_) if !strict => {
                // Unquoted value runs to the next whitespace
                let value_start = pos;
                while pos < input.len() && !is_whitespace(input[pos]) {
                    pos += 1;
                }
                let value = decode_text(&input[value_start..pos]);
                attrs.push(Attribute::new(name, value));
                continue;
            }
            Some(_) => return Err("Attribute value must be quoted"),
            None if strict => return Err("Attribute value required"),
            None => return Ok(()),
        };

        let value_start = pos + 1;
        let value_end = match memchr(quote, &input[value_start..]) {
            Some(offset) => value_start + offset,
            None if strict => return Err("Attribute value is not terminated"),
            None => input.len(),
        };
        let raw = &input[value_start..value_end];

        if strict && memchr(b'<', raw).is_some() {
            return Err("Attribute value cannot contain '<'");
        }

        let value = match normalize_whitespace(raw) {
            Cow::Borrowed(raw) if strict => decode_text_strict(raw)?,
            Cow::Borrowed(raw) => decode_text(raw),
            Cow::Owned(normalized) if strict => {
                Cow::Owned(decode_text_strict(&normalized)?.into_owned())
            }
            Cow::Owned(normalized) => Cow::Owned(decode_text(&normalized).into_owned()),
        };
        attrs.push(Attribute::new(name, value));

        pos = (value_end + 1).min(input.len());
    }
}

/// Literal tab, newline and carriage return become spaces
fn normalize_whitespace(raw: &[u8]) -> Cow<'_, [u8]> {
    if !raw.iter().any(|&b| matches!(b, b'\t' | b'\n' | b'\r')) {
        return Cow::Borrowed(raw);
    }
    Cow::Owned(
        raw.iter()
            .map(|&b| if matches!(b, b'\t' | b'\n' | b'\r') { b' ' } else { b })
            .collect(),
    )
}

#[inline]
fn skip_whitespace(input: &[u8], mut pos: usize) -> usize {
    while pos < input.len() && is_whitespace(input[pos]) {
        pos += 1;
    }
    pos
}

#[inline]
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// NameStartChar, with every non-ASCII byte accepted
#[inline]
pub fn is_name_start_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

#[inline]
pub fn is_name_char(b: u8) -> bool {
    is_name_start_char(b) || matches!(b, b'0'..=b'9' | b'-' | b'.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_attributes() {
        let attrs = parse_attributes(b" rel=\"self\" href='http://host/obj?id=1'");
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].name_str(), Some("rel"));
        assert_eq!(attrs[0].value_str(), Some("self"));
        assert_eq!(attrs[1].value_str(), Some("http://host/obj?id=1"));
    }

    #[test]
    fn test_prefixed_names() {
        let attrs = parse_attributes(b" xmlns:cmis=\"urn:c\" xmlns=\"urn:d\" cmis:id=\"x\"");
        assert_eq!(attrs[0].prefix(), Some(&b"xmlns"[..]));
        assert_eq!(attrs[0].local_name(), b"cmis");
        assert_eq!(attrs[0].declared_prefix(), Some(&b"cmis"[..]));
        assert_eq!(attrs[1].declared_prefix(), Some(&b""[..]));
        assert_eq!(attrs[2].declared_prefix(), None);
        assert_eq!(attrs[2].local_name(), b"id");
    }

    #[test]
    fn test_value_decoding() {
        let attrs = parse_attributes(b" title=\"&lt;a&gt;\tb&#10;c\"");
        assert_eq!(attrs[0].value_str(), Some("<a> b\nc"));
    }

    #[test]
    fn test_whitespace_around_equals() {
        let attrs = parse_attributes(b"  id  =  \"test\"  ");
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].value_str(), Some("test"));
    }

    #[test]
    fn test_lenient_recovers() {
        let attrs = parse_attributes(b" checked id=unquoted x=\"open");
        assert_eq!(attrs.len(), 3);
        assert_eq!(attrs[0].value_str(), Some(""));
        assert_eq!(attrs[1].value_str(), Some("unquoted"));
        assert_eq!(attrs[2].value_str(), Some("open"));
    }

    #[test]
    fn test_strict_errors() {
        assert!(parse_attributes_strict(b" checked").is_err());
        assert!(parse_attributes_strict(b" id=unquoted").is_err());
        assert!(parse_attributes_strict(b" a=\"<\"").is_err());
        assert!(parse_attributes_strict(b" a=\"x\"b=\"y\"").is_err());
        assert!(parse_attributes_strict(b" a=\"&bogus;\"").is_err());
        assert_eq!(parse_attributes_strict(b" a=\"1\" b='2'").unwrap().len(), 2);
    }
}
