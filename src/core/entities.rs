//! Entity references
//!
//! Decoding of the five predefined entities and numeric character
//! references, plus escaping for serialization. Both directions return
//! `Cow::Borrowed` when the input needs no change.

use memchr::{memchr, memchr3};
use std::borrow::Cow;

/// Decode entity references in text or attribute content (lenient)
///
/// Unknown or unterminated references are kept verbatim.
#[inline]
pub fn decode_text(input: &[u8]) -> Cow<'_, [u8]> {
    if memchr(b'&', input).is_none() {
        return Cow::Borrowed(input);
    }
    match decode_entities(input, false) {
        Ok(decoded) => Cow::Owned(decoded),
        Err(_) => Cow::Borrowed(input),
    }
}

/// Decode entity references, rejecting malformed or unknown references
pub fn decode_text_strict(input: &[u8]) -> Result<Cow<'_, [u8]>, &'static str> {
    if memchr(b'&', input).is_none() {
        return Ok(Cow::Borrowed(input));
    }
    decode_entities(input, true).map(Cow::Owned)
}

fn decode_entities(input: &[u8], strict: bool) -> Result<Vec<u8>, &'static str> {
    let mut out = Vec::with_capacity(input.len());
    let mut pos = 0;

    while let Some(amp) = memchr(b'&', &input[pos..]) {
        out.extend_from_slice(&input[pos..pos + amp]);
        pos += amp;

        let decoded = memchr(b';', &input[pos..])
            .and_then(|semi| decode_entity(&input[pos + 1..pos + semi]).map(|c| (c, semi)));

        match decoded {
            Some((c, semi)) => {
                let mut utf8 = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
                pos += semi + 1;
            }
            None if strict => return Err("Malformed entity reference"),
            None => {
                out.push(b'&');
                pos += 1;
            }
        }
    }
    out.extend_from_slice(&input[pos..]);
    Ok(out)
}

/// Decode one reference body (between `&` and `;`)
fn decode_entity(entity: &[u8]) -> Option<char> {
    match entity {
        b"lt" => Some('<'),
        b"gt" => Some('>'),
        b"amp" => Some('&'),
        b"quot" => Some('"'),
        b"apos" => Some('\''),
        [b'#', b'x' | b'X', hex @ ..] => parse_codepoint(hex, 16),
        [b'#', dec @ ..] => parse_codepoint(dec, 10),
        _ => None,
    }
}

fn parse_codepoint(digits: &[u8], radix: u32) -> Option<char> {
    if digits.is_empty() {
        return None;
    }
    let digits = std::str::from_utf8(digits).ok()?;
    let codepoint = u32::from_str_radix(digits, radix).ok()?;
    if !is_valid_xml_char(codepoint) {
        return None;
    }
    char::from_u32(codepoint)
}

/// XML 1.0 `Char` production
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}

/// Escape character data for element content
pub fn escape_text(input: &str) -> Cow<'_, str> {
    if memchr3(b'<', b'>', b'&', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Escape a value for a double-quoted attribute
///
/// Whitespace control characters are written as character references so
/// attribute-value normalization does not flatten them on re-read.
pub fn escape_attribute(input: &str) -> Cow<'_, str> {
    let needs_escape = input
        .bytes()
        .any(|b| matches!(b, b'<' | b'&' | b'"' | b'\t' | b'\n' | b'\r'));
    if !needs_escape {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_entities_borrows() {
        let result = decode_text(b"plain text");
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result.as_ref(), b"plain text");
    }

    #[test]
    fn test_predefined_entities() {
        let result = decode_text(b"&lt;cmis:name&gt; &amp; &quot;q&quot; &apos;a&apos;");
        assert_eq!(result.as_ref(), b"<cmis:name> & \"q\" 'a'");
    }

    #[test]
    fn test_character_references() {
        assert_eq!(decode_text(b"&#65;&#x42;&#X43;").as_ref(), b"ABC");
        assert_eq!(
            std::str::from_utf8(decode_text(b"caf&#xE9;").as_ref()).unwrap(),
            "caf\u{e9}"
        );
    }

    #[test]
    fn test_lenient_keeps_unknown() {
        assert_eq!(decode_text(b"&nbsp;").as_ref(), b"&nbsp;");
        assert_eq!(decode_text(b"a & b").as_ref(), b"a & b");
        assert_eq!(decode_text(b"&#0;").as_ref(), b"&#0;");
    }

    #[test]
    fn test_strict_rejects_unknown() {
        assert!(decode_text_strict(b"&nbsp;").is_err());
        assert!(decode_text_strict(b"a & b").is_err());
        assert!(decode_text_strict(b"&#xD800;").is_err());
        assert_eq!(decode_text_strict(b"&amp;").unwrap().as_ref(), b"&");
    }

    #[test]
    fn test_escape_text() {
        assert!(matches!(escape_text("no markup"), Cow::Borrowed(_)));
        assert_eq!(escape_text("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
        // Quotes are fine in content
        assert_eq!(escape_text("\"q\""), "\"q\"");
    }

    #[test]
    fn test_escape_attribute() {
        assert_eq!(escape_attribute("say \"hi\" & <go>"), "say &quot;hi&quot; &amp; &lt;go>");
        assert_eq!(escape_attribute("a\nb"), "a&#10;b");
        assert!(matches!(escape_attribute("self"), Cow::Borrowed(_)));
    }
}
