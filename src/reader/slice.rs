//! Slice Reader
//!
//! Pull parser over a byte slice. Names, comments, CDATA and PIs borrow
//! from the input; text borrows unless it contained entity references.
//!
//! Lenient mode recovers from malformed markup the way a browser would:
//! stray `<` becomes text and unterminated constructs run to the end of
//! input. Strict mode stops at the first syntax error and reports it
//! through [`SliceReader::error`].

use super::events::{EndElement, StartElement, XmlEvent};
use crate::core::attributes::{
    is_name_char, is_name_start_char, is_whitespace, parse_attributes, parse_attributes_strict,
    Attribute,
};
use crate::core::entities::{decode_text, decode_text_strict};
use crate::error::XmlError;
use memchr::{memchr, memmem};
use std::borrow::Cow;

/// Zero-copy XML reader over a byte slice
pub struct SliceReader<'a> {
    input: &'a [u8],
    pos: usize,
    strict: bool,
    error: Option<XmlError>,
    finished: bool,
}

impl<'a> SliceReader<'a> {
    /// Lenient reader
    pub fn new(input: &'a [u8]) -> Self {
        SliceReader {
            input,
            pos: 0,
            strict: false,
            error: None,
            finished: false,
        }
    }

    /// Strict reader, stops at the first syntax error
    pub fn new_strict(input: &'a [u8]) -> Self {
        SliceReader {
            strict: true,
            ..SliceReader::new(input)
        }
    }

    /// First syntax error seen (strict mode only)
    pub fn error(&self) -> Option<&XmlError> {
        self.error.as_ref()
    }

    /// Byte offset of the next unread input
    pub fn position(&self) -> usize {
        self.pos
    }

    fn fail(&mut self, message: &'static str, offset: usize) -> Option<XmlEvent<'a>> {
        if self.error.is_none() {
            self.error = Some(XmlError::Syntax { message, offset });
        }
        self.finished = true;
        None
    }

    /// Next event, `EndDocument` once at the end, then None
    ///
    /// In strict mode an error also ends the stream with None.
    pub fn next_event(&mut self) -> Option<XmlEvent<'a>> {
        if self.finished {
            return None;
        }
        if self.pos >= self.input.len() {
            self.finished = true;
            return Some(XmlEvent::EndDocument);
        }
        if self.input[self.pos] == b'<' {
            self.read_markup()
        } else {
            self.read_text(false)
        }
    }

    /// Character data up to the next markup
    ///
    /// `stray_lt` means the current byte is a `<` that starts no markup and
    /// belongs to the text.
    fn read_text(&mut self, stray_lt: bool) -> Option<XmlEvent<'a>> {
        let input = self.input;
        let start = self.pos;
        let from = start + usize::from(stray_lt);
        let end = memchr(b'<', &input[from..]).map_or(input.len(), |offset| from + offset);
        let raw = &input[start..end];
        self.pos = end;

        if !self.strict {
            return Some(XmlEvent::Text(decode_text(raw)));
        }
        if memmem::find(raw, b"]]>").is_some() {
            return self.fail("']]>' not allowed in character data", start);
        }
        match decode_text_strict(raw) {
            Ok(text) => Some(XmlEvent::Text(text)),
            Err(message) => self.fail(message, start),
        }
    }

    fn read_markup(&mut self) -> Option<XmlEvent<'a>> {
        let start = self.pos;
        let rest = &self.input[start..];

        if rest.starts_with(b"<?") {
            self.read_pi(start)
        } else if rest.starts_with(b"<!--") {
            self.read_delimited(start, 4, b"-->", "Unterminated comment")
        } else if rest.starts_with(b"<![CDATA[") {
            self.read_delimited(start, 9, b"]]>", "Unterminated CDATA section")
        } else if rest.starts_with(b"<!DOCTYPE") {
            self.read_doctype(start)
        } else if rest.starts_with(b"</") {
            self.read_end_tag(start)
        } else if rest.len() > 1 && is_name_start_char(rest[1]) {
            self.read_start_tag(start)
        } else if self.strict {
            self.fail("Invalid markup", start)
        } else {
            self.read_text(true)
        }
    }

    /// Comments and CDATA: content between a fixed opener and `close`
    fn read_delimited(
        &mut self,
        start: usize,
        open_len: usize,
        close: &[u8],
        unterminated: &'static str,
    ) -> Option<XmlEvent<'a>> {
        let input = self.input;
        let content_start = start + open_len;
        let (content_end, next) = match memmem::find(&input[content_start..], close) {
            Some(offset) => (content_start + offset, content_start + offset + close.len()),
            None if self.strict => return self.fail(unterminated, start),
            None => (input.len(), input.len()),
        };
        let content = &input[content_start..content_end];
        self.pos = next;

        if close == b"-->" {
            if self.strict && memmem::find(content, b"--").is_some() {
                return self.fail("'--' not allowed in comment", start);
            }
            Some(XmlEvent::Comment(content))
        } else {
            Some(XmlEvent::CData(content))
        }
    }

    fn read_pi(&mut self, start: usize) -> Option<XmlEvent<'a>> {
        let input = self.input;
        let body_start = start + 2;
        let (body_end, next) = match memmem::find(&input[body_start..], b"?>") {
            Some(offset) => (body_start + offset, body_start + offset + 2),
            None if self.strict => return self.fail("Unterminated processing instruction", start),
            None => (input.len(), input.len()),
        };
        let body = &input[body_start..body_end];
        self.pos = next;

        let name_len = body.iter().take_while(|&&b| is_name_char(b)).count();
        let target = &body[..name_len];
        if target.is_empty() {
            if self.strict {
                return self.fail("Processing instruction target required", start);
            }
            return self.next_event();
        }

        let data = body[name_len..]
            .iter()
            .position(|&b| !is_whitespace(b))
            .map(|skip| &body[name_len + skip..]);

        if target == b"xml" {
            if self.strict && start != 0 {
                return self.fail("XML declaration allowed only at document start", start);
            }
            let attrs = match data {
                Some(data) => self.tag_attributes(data, start)?,
                None => Vec::new(),
            };
            return Some(declaration(&attrs));
        }
        if self.strict && target.eq_ignore_ascii_case(b"xml") {
            return self.fail("Reserved processing instruction target", start);
        }
        Some(XmlEvent::ProcessingInstruction { target, data })
    }

    /// DOCTYPE with an optional internal subset in brackets
    fn read_doctype(&mut self, start: usize) -> Option<XmlEvent<'a>> {
        let input = self.input;
        let body_start = start + 9;
        let mut depth = 0usize;
        let mut quote: Option<u8> = None;
        let mut pos = body_start;

        while pos < input.len() {
            let b = input[pos];
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None => match b {
                    b'"' | b'\'' => quote = Some(b),
                    b'[' => depth += 1,
                    b']' => depth = depth.saturating_sub(1),
                    b'>' if depth == 0 => {
                        self.pos = pos + 1;
                        return Some(XmlEvent::DocType(trim(&input[body_start..pos])));
                    }
                    _ => {}
                },
            }
            pos += 1;
        }

        if self.strict {
            return self.fail("Unterminated DOCTYPE", start);
        }
        self.pos = input.len();
        Some(XmlEvent::DocType(trim(&input[body_start..])))
    }

    fn read_end_tag(&mut self, start: usize) -> Option<XmlEvent<'a>> {
        let input = self.input;
        let name_start = start + 2;
        let close = match memchr(b'>', &input[name_start..]) {
            Some(offset) => name_start + offset,
            None if self.strict => return self.fail("Unterminated end tag", start),
            None => input.len(),
        };
        let body = &input[name_start..close];
        self.pos = (close + 1).min(input.len());

        let name_len = body.iter().take_while(|&&b| is_name_char(b)).count();
        let name = &body[..name_len];
        if self.strict && (name.is_empty() || !body[name_len..].iter().all(|&b| is_whitespace(b))) {
            return self.fail("Malformed end tag", start);
        }
        if name.is_empty() {
            return self.next_event();
        }
        Some(XmlEvent::EndElement(EndElement::new(name)))
    }

    fn read_start_tag(&mut self, start: usize) -> Option<XmlEvent<'a>> {
        let input = self.input;
        let close = match find_tag_end(&input[start..]) {
            Some(offset) => start + offset,
            None if self.strict => return self.fail("Unterminated start tag", start),
            None => input.len(),
        };
        self.pos = (close + 1).min(input.len());

        let body = &input[start + 1..close];
        let (body, empty) = match body.last() {
            Some(b'/') => (&body[..body.len() - 1], true),
            _ => (body, false),
        };

        let name_len = body.iter().take_while(|&&b| is_name_char(b)).count();
        let name = &body[..name_len];
        let rest = &body[name_len..];
        if self.strict && !rest.is_empty() && !is_whitespace(rest[0]) {
            return self.fail("Invalid character in element name", start);
        }

        let attributes = self.tag_attributes(rest, start)?;
        let element = StartElement::new(name, attributes);
        Some(if empty {
            XmlEvent::EmptyElement(element)
        } else {
            XmlEvent::StartElement(element)
        })
    }

    fn tag_attributes(&mut self, content: &'a [u8], start: usize) -> Option<Vec<Attribute<'a>>> {
        if !self.strict {
            return Some(parse_attributes(content));
        }
        match parse_attributes_strict(content) {
            Ok(attrs) => Some(attrs),
            Err(message) => {
                self.fail(message, start);
                None
            }
        }
    }
}

impl<'a> Iterator for SliceReader<'a> {
    type Item = XmlEvent<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_event()? {
            XmlEvent::EndDocument => None,
            event => Some(event),
        }
    }
}

/// Offset of the `>` closing a tag, skipping quoted attribute values
fn find_tag_end(tag: &[u8]) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, &b) in tag.iter().enumerate() {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(i),
            None => {}
        }
    }
    None
}

fn declaration<'a>(attrs: &[Attribute<'a>]) -> XmlEvent<'a> {
    let find = |name: &[u8]| attrs.iter().find(|a| a.name == name).map(|a| a.value.clone());
    XmlEvent::XmlDeclaration {
        version: find(b"version").unwrap_or(Cow::Borrowed(b"1.0")),
        encoding: find(b"encoding"),
        standalone: find(b"standalone").map(|v| v.as_ref() == b"yes"),
    }
}

fn trim(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| !is_whitespace(b)).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|&b| !is_whitespace(b)).map_or(start, |p| p + 1);
    &bytes[start..end]
}

/// All events of a document, lenient
pub fn parse_events(input: &[u8]) -> Vec<XmlEvent<'_>> {
    SliceReader::new(input).collect()
}
