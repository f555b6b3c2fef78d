//! XML access layer: parse DocBook sources into the tree model.
//!
//! `XmlLoader` is an explicitly constructed parser configuration with a
//! lifecycle scoped to one assembly run; nothing here is process-global.
//! Parsing reads the whole file, scans the DOCTYPE internal subset into an
//! [`EntityCatalog`](crate::entities::EntityCatalog), builds the element
//! tree with entity-aware unescaping, drops whitespace-only text in
//! element-only content (so the pretty-printer can re-indent losslessly,
//! while mixed content keeps its spacing), and finally expands XInclude
//! directives in place.

use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::escape::{resolve_predefined_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};

use crate::entities::EntityCatalog;
use crate::error::{IndexError, Result};
use crate::tree::{Document, Element, Node};
use crate::xinclude;

/// How deep XInclude chains may nest before the loader gives up. Guards
/// against include cycles.
pub(crate) const MAX_INCLUDE_DEPTH: usize = 16;

/// Parser configuration for one assembly run.
#[derive(Debug, Clone)]
pub struct XmlLoader {
    entities_file: PathBuf,
}

impl Default for XmlLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlLoader {
    pub fn new() -> Self {
        XmlLoader {
            entities_file: PathBuf::from("man/custom-entities.ent"),
        }
    }

    /// Local file substituted for any external entity reference whose system
    /// identifier contains `custom-entities.ent`.
    pub fn with_entities_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.entities_file = path.into();
        self
    }

    /// Parse an XML file and expand its XInclude directives.
    pub fn parse_file(&self, path: &Path) -> Result<Document> {
        self.parse_file_at_depth(path, 0)
    }

    pub(crate) fn parse_file_at_depth(&self, path: &Path, depth: usize) -> Result<Document> {
        let origin = path.display().to_string();
        if depth > MAX_INCLUDE_DEPTH {
            return Err(IndexError::XInclude {
                origin,
                details: "includes nested too deeply".to_string(),
            });
        }
        let text = fs::read_to_string(path)
            .map_err(|e| IndexError::parse(origin.as_str(), e.to_string()))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut doc = self.parse_with_base(&text, &origin, base_dir)?;
        xinclude::expand(self, &mut doc.root, base_dir, &origin, depth)?;
        Ok(doc)
    }

    /// Parse a standalone XML string (no XInclude pass). Used for the fixed
    /// output templates and in tests.
    pub fn parse_str(&self, text: &str, origin: &str) -> Result<Document> {
        self.parse_with_base(text, origin, Path::new("."))
    }

    fn parse_with_base(&self, text: &str, origin: &str, base_dir: &Path) -> Result<Document> {
        let mut reader = Reader::from_str(text);
        let mut catalog = EntityCatalog::new(&self.entities_file);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event() {
                Err(e) => return Err(IndexError::parse(origin, e.to_string())),
                Ok(Event::Eof) => break,
                Ok(Event::DocType(doctype)) => {
                    let subset = decode_utf8(doctype.as_ref(), origin)?;
                    catalog.scan_subset(subset, base_dir, origin)?;
                }
                Ok(Event::Start(start)) => {
                    let el = element_from_start(&start, &catalog, origin)?;
                    stack.push(el);
                }
                Ok(Event::Empty(start)) => {
                    let el = element_from_start(&start, &catalog, origin)?;
                    attach(el, &mut stack, &mut root, origin)?;
                }
                Ok(Event::End(_)) => {
                    // Mismatched end tags are caught by the reader itself.
                    if let Some(el) = stack.pop() {
                        attach(el, &mut stack, &mut root, origin)?;
                    }
                }
                Ok(Event::Text(chunk)) => {
                    let raw = decode_utf8(chunk.as_ref(), origin)?;
                    let resolved = unescape_text(raw, &catalog, origin)?;
                    push_text(&resolved, &mut stack, origin)?;
                }
                Ok(Event::CData(data)) => {
                    let raw = decode_utf8(data.as_ref(), origin)?;
                    push_text(raw, &mut stack, origin)?;
                }
                Ok(Event::Decl(_)) | Ok(Event::Comment(_)) | Ok(Event::PI(_)) => {}
            }
        }

        match root {
            Some(mut root) if stack.is_empty() => {
                prune_blank_text(&mut root);
                Ok(Document { root })
            }
            _ => Err(IndexError::parse(origin, "document has no root element")),
        }
    }
}

fn element_from_start(
    start: &BytesStart<'_>,
    catalog: &EntityCatalog,
    origin: &str,
) -> Result<Element> {
    let qname = start.name();
    let name = decode_utf8(qname.as_ref(), origin)?;
    let mut el = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| IndexError::parse(origin, e.to_string()))?;
        let key = decode_utf8(attr.key.as_ref(), origin)?.to_string();
        let raw = decode_utf8(&attr.value, origin)?;
        let value = unescape_text(raw, catalog, origin)?;
        el.attributes.push((key, value));
    }
    Ok(el)
}

fn attach(
    el: Element,
    stack: &mut Vec<Element>,
    root: &mut Option<Element>,
    origin: &str,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(Node::Element(el));
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(el);
            Ok(())
        }
        None => Err(IndexError::parse(origin, "multiple root elements")),
    }
}

fn push_text(text: &str, stack: &mut [Element], origin: &str) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            // Merge adjacent runs so entity boundaries are invisible.
            if let Some(Node::Text(prev)) = parent.children.last_mut() {
                prev.push_str(text);
            } else {
                parent.push_text(text);
            }
            Ok(())
        }
        // Formatting around the root element.
        None if text.trim().is_empty() => Ok(()),
        None => Err(IndexError::parse(origin, "text outside of root element")),
    }
}

/// Whitespace-only text nodes are formatting when the element carries no
/// other character data. In mixed content they separate inline elements and
/// must survive.
fn prune_blank_text(el: &mut Element) {
    let mixed = el
        .children
        .iter()
        .any(|n| matches!(n, Node::Text(t) if !t.trim().is_empty()));
    if !mixed {
        el.children.retain(|n| matches!(n, Node::Element(_)));
    }
    for child in &mut el.children {
        if let Node::Element(child) = child {
            prune_blank_text(child);
        }
    }
}

fn unescape_text(raw: &str, catalog: &EntityCatalog, origin: &str) -> Result<String> {
    let mut unknown: Option<String> = None;
    let resolved = unescape_with(raw, |name| {
        resolve_predefined_entity(name)
            .or_else(|| catalog.resolve(name))
            .or_else(|| {
                unknown = Some(name.to_string());
                None
            })
    });
    match resolved {
        Ok(cow) => Ok(cow.into_owned()),
        Err(e) => Err(match unknown {
            Some(name) => IndexError::UnresolvedEntity {
                origin: origin.to_string(),
                name,
            },
            None => IndexError::parse(origin, e.to_string()),
        }),
    }
}

fn decode_utf8<'a>(bytes: &'a [u8], origin: &str) -> Result<&'a str> {
    std::str::from_utf8(bytes).map_err(|e| IndexError::parse(origin, e.to_string()))
}
