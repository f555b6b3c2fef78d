//! XInclude expansion.
//!
//! After a document is parsed, every `xi:include` element is replaced in
//! place by the root of the referenced document, itself fully expanded.
//! `href` is resolved relative to the including file. A bare `xpointer`
//! attribute selects the subtree whose `id` attribute matches. When the
//! target cannot be loaded, the children of an `xi:fallback` child are
//! spliced in instead; without a fallback the failure is fatal.

use std::path::Path;

use crate::error::{IndexError, Result};
use crate::parser::XmlLoader;
use crate::tree::{Element, Node};

pub const XINCLUDE_NS: &str = "http://www.w3.org/2001/XInclude";

/// Expand all includes below `el`, recursively. `depth` counts how many
/// include hops led to this document.
pub(crate) fn expand(
    loader: &XmlLoader,
    el: &mut Element,
    base_dir: &Path,
    origin: &str,
    depth: usize,
) -> Result<()> {
    let mut i = 0;
    while i < el.children.len() {
        let is_include = matches!(&el.children[i], Node::Element(child) if is_include(child));
        if is_include {
            let include = match &el.children[i] {
                Node::Element(child) => child.clone(),
                Node::Text(_) => unreachable!(),
            };
            let replacement = resolve_include(loader, &include, base_dir, origin, depth)?;
            el.children.splice(i..i + 1, replacement);
            // Do not advance: fallback content may itself contain includes.
            continue;
        }
        if let Node::Element(child) = &mut el.children[i] {
            expand(loader, child, base_dir, origin, depth)?;
        }
        i += 1;
    }
    Ok(())
}

/// An element is an include directive when its local name is `include` and
/// it is (conventionally or explicitly) in the XInclude namespace.
fn is_include(el: &Element) -> bool {
    match el.name.split_once(':') {
        Some((prefix, "include")) => el
            .attr(&format!("xmlns:{prefix}"))
            .map_or(prefix == "xi", |ns| ns == XINCLUDE_NS),
        None if el.name == "include" => el.attr("xmlns") == Some(XINCLUDE_NS),
        _ => false,
    }
}

fn resolve_include(
    loader: &XmlLoader,
    include: &Element,
    base_dir: &Path,
    origin: &str,
    depth: usize,
) -> Result<Vec<Node>> {
    let Some(href) = include.attr("href") else {
        return Err(IndexError::XInclude {
            origin: origin.to_string(),
            details: "include directive without href".to_string(),
        });
    };
    let target = base_dir.join(href);

    match loader.parse_file_at_depth(&target, depth + 1) {
        Ok(doc) => {
            let subtree = match include.attr("xpointer") {
                None => doc.root,
                Some(pointer) => select_pointer(doc.root, pointer, origin, href)?,
            };
            Ok(vec![Node::Element(subtree)])
        }
        Err(err) => match fallback_children(include) {
            Some(children) => Ok(children),
            None => Err(IndexError::XInclude {
                origin: origin.to_string(),
                details: format!("cannot include '{href}': {err}"),
            }),
        },
    }
}

/// Bare-id xpointer subset: the pointer names the `id` attribute of the
/// element to include. The `element(id)` wrapper form is accepted too.
fn select_pointer(root: Element, pointer: &str, origin: &str, href: &str) -> Result<Element> {
    let id = pointer
        .strip_prefix("element(")
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(pointer);
    if root.attr("id") == Some(id) {
        return Ok(root);
    }
    root.find_descendant(&|el| el.attr("id") == Some(id))
        .cloned()
        .ok_or_else(|| IndexError::XInclude {
            origin: origin.to_string(),
            details: format!("no element with id '{id}' in '{href}'"),
        })
}

fn fallback_children(include: &Element) -> Option<Vec<Node>> {
    include
        .child_elements()
        .find(|el| {
            el.name == "xi:fallback"
                || (el.name == "fallback" && el.attr("xmlns") == Some(XINCLUDE_NS))
        })
        .map(|fb| fb.children.clone())
}
