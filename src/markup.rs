//! XML wire format support.
//!
//! Parses appliance configuration XML into an [`Element`] tree and writes a
//! tree back out. Output is deterministic: two-space indentation, an XML
//! declaration, and children emitted in tree order. It is not guaranteed to
//! be byte-identical to what the appliance last wrote, only structurally
//! equivalent.

use std::fs;
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

use crate::tree::Element;

/// Errors raised while converting between XML text and an [`Element`] tree.
#[derive(Debug, Error)]
pub enum MarkupError {
    /// Input could not be tokenized as XML.
    #[error("failed to parse XML: {0}")]
    Xml(#[from] quick_xml::Error),
    /// Tag or text bytes were not valid UTF-8.
    #[error("invalid UTF-8 in XML document: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    /// Failed to unescape an XML entity.
    #[error("failed to decode XML text: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),
    /// Failed to read or write a document file.
    #[error("XML file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// Document is structurally broken (unbalanced tags, no root, ...).
    #[error("malformed XML document: {0}")]
    Malformed(String),
}

/// Parse XML bytes into an [`Element`] tree rooted at the single top-level
/// element.
pub fn parse(xml: &[u8]) -> Result<Element, MarkupError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => {
                stack.push(element_from_start(&start)?);
            }
            Event::Empty(start) => {
                let node = element_from_start(&start)?;
                attach(node, &mut stack, &mut root)?;
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    append_text(current, &text.unescape()?);
                }
            }
            Event::CData(cdata) => {
                if let Some(current) = stack.last_mut() {
                    append_text(current, std::str::from_utf8(cdata.as_ref())?);
                }
            }
            Event::End(_) => {
                let node = stack.pop().ok_or_else(|| {
                    MarkupError::Malformed("closing tag without an open element".to_string())
                })?;
                attach(node, &mut stack, &mut root)?;
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) | Event::Comment(_) => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(MarkupError::Malformed(
            "unclosed element(s) at end of document".to_string(),
        ));
    }

    root.ok_or_else(|| MarkupError::Malformed("no root element found".to_string()))
}

/// Parse an XML file into an [`Element`] tree.
pub fn parse_file(path: &Path) -> Result<Element, MarkupError> {
    let bytes = fs::read(path)?;
    parse(&bytes)
}

/// Serialize an [`Element`] tree into an XML string with a leading
/// declaration, the way the appliance stores its own configuration.
pub fn write(root: &Element) -> Result<String, MarkupError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_element(&mut writer, root)?;

    let mut out = String::from_utf8(writer.into_inner())
        .map_err(|err| MarkupError::Utf8(err.utf8_error()))?;
    out.push('\n');
    Ok(out)
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, MarkupError> {
    let tag = std::str::from_utf8(start.name().as_ref())?.to_string();
    Ok(Element::new(tag))
}

/// Hand a completed element to its parent, or install it as the root.
fn attach(
    node: Element,
    stack: &mut [Element],
    root: &mut Option<Element>,
) -> Result<(), MarkupError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        return Ok(());
    }
    if root.is_some() {
        return Err(MarkupError::Malformed(
            "multiple top-level elements found".to_string(),
        ));
    }
    *root = Some(node);
    Ok(())
}

fn append_text(node: &mut Element, text: &str) {
    if text.trim().is_empty() {
        return;
    }
    match &mut node.text {
        Some(existing) => existing.push_str(text),
        None => node.text = Some(text.to_string()),
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, node: &Element) -> Result<(), quick_xml::Error> {
    let start = BytesStart::new(node.tag.as_str());

    if node.children.is_empty() && node.text.is_none() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if let Some(text) = &node.text {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    for child in &node.children {
        write_element(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(node.tag.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse, write, MarkupError};

    #[test]
    fn parses_nested_elements_and_text() {
        let root = parse(
            br#"<pfsense>
                <system><hostname>edge</hostname></system>
                <interfaces><lan><ipaddr>192.168.1.1</ipaddr></lan></interfaces>
            </pfsense>"#,
        )
        .expect("parse");

        assert_eq!(root.tag, "pfsense");
        assert_eq!(root.text_at(&["system", "hostname"]), Some("edge"));
        assert_eq!(
            root.text_at(&["interfaces", "lan", "ipaddr"]),
            Some("192.168.1.1")
        );
    }

    #[test]
    fn folds_cdata_into_text() {
        let root = parse(br#"<pfsense><system><hostname><![CDATA[fw-1]]></hostname></system></pfsense>"#)
            .expect("parse");
        assert_eq!(root.text_at(&["system", "hostname"]), Some("fw-1"));
    }

    #[test]
    fn rejects_multiple_roots() {
        let err = parse(b"<a/><b/>").expect_err("should fail");
        assert!(matches!(err, MarkupError::Malformed(_)));
    }

    #[test]
    fn rejects_unclosed_element() {
        let err = parse(b"<pfsense><system>").expect_err("should fail");
        assert!(matches!(err, MarkupError::Malformed(_)));
    }

    #[test]
    fn write_then_parse_preserves_tree() {
        let root = parse(
            br#"<pfsense><system><hostname>edge</hostname><domain>lan.local</domain></system><dhcpd><lan/></dhcpd></pfsense>"#,
        )
        .expect("parse");

        let text = write(&root).expect("write");
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));

        let reparsed = parse(text.as_bytes()).expect("re-parse");
        assert_eq!(root, reparsed);
    }
}
