//! Pretty-printing serializer.
//!
//! Output contract: UTF-8 bytes, XML declaration, two-space indentation with
//! child elements on their own lines. Mixed content (any element whose
//! children include character data) is written inline so the text the
//! assembler produced survives a serialize/re-parse round trip unchanged.

use quick_xml::escape::{escape, partial_escape};

use crate::tree::{Document, Element, Node};

const INDENT: &str = "  ";

/// Render a document to UTF-8 bytes, ready to write to a file.
pub fn to_bytes(doc: &Document) -> Vec<u8> {
    let mut out = String::from("<?xml version='1.0' encoding='utf-8'?>\n");
    write_element(&mut out, &doc.root, 0);
    out.push('\n');
    out.into_bytes()
}

fn write_element(out: &mut String, el: &Element, depth: usize) {
    out.push('<');
    out.push_str(&el.name);
    for (key, value) in &el.attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(value.as_str()));
        out.push('"');
    }
    if el.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');

    let mixed = el.children.iter().any(|n| matches!(n, Node::Text(_)));
    if mixed {
        for child in &el.children {
            match child {
                Node::Text(text) => out.push_str(&partial_escape(text.as_str())),
                Node::Element(child) => write_element(out, child, depth + 1),
            }
        }
    } else {
        for child in &el.children {
            if let Node::Element(child) = child {
                out.push('\n');
                out.push_str(&INDENT.repeat(depth + 1));
                write_element(out, child, depth + 1);
            }
        }
        out.push('\n');
        out.push_str(&INDENT.repeat(depth));
    }

    out.push_str("</");
    out.push_str(&el.name);
    out.push('>');
}
