//! In-memory XML document model.
//!
//! A deliberately small tree: elements carry a name, attributes in document
//! order, and a list of child nodes (elements and text). Lookup helpers cover
//! the fixed child paths the assembler reads (`refmeta/manvolnum` and
//! friends) plus a descendant search for id-addressed rewrites.

/// A parsed XML document. The prolog (declaration, doctype) is not retained;
/// entity declarations are consumed during parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: Element,
}

/// One node in element content: a child element or a run of character data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    /// Attributes in document order; duplicate names are rejected at parse time.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Append a child element and return a mutable reference to it.
    pub fn push_element(&mut self, name: impl Into<String>) -> &mut Element {
        self.children.push(Node::Element(Element::new(name)));
        match self.children.last_mut() {
            Some(Node::Element(el)) => el,
            _ => unreachable!(),
        }
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(Node::Text(text.into()));
    }

    /// Direct child elements, in document order.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    /// First element addressed by a `/`-separated direct-child path, e.g.
    /// `refnamediv/refname`.
    pub fn find(&self, path: &str) -> Option<&Element> {
        let mut current = self;
        for step in path.split('/') {
            current = current.child_elements().find(|el| el.name == step)?;
        }
        Some(current)
    }

    /// Every element addressed by a direct-child path, in document order.
    pub fn find_all(&self, path: &str) -> Vec<&Element> {
        let mut matches = vec![self];
        for step in path.split('/') {
            matches = matches
                .into_iter()
                .flat_map(|el| el.child_elements().filter(|c| c.name == step))
                .collect();
        }
        matches
    }

    /// Depth-first search over all descendants, self excluded.
    pub fn find_descendant(&self, pred: &dyn Fn(&Element) -> bool) -> Option<&Element> {
        for child in self.child_elements() {
            if pred(child) {
                return Some(child);
            }
            if let Some(found) = child.find_descendant(pred) {
                return Some(found);
            }
        }
        None
    }

    pub fn find_descendant_mut(
        &mut self,
        pred: &dyn Fn(&Element) -> bool,
    ) -> Option<&mut Element> {
        for child in self.children.iter_mut() {
            if let Node::Element(el) = child {
                if pred(el) {
                    return Some(el);
                }
                if let Some(found) = el.find_descendant_mut(pred) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Concatenated character data of this element and all descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(t),
                Node::Element(el) => el.collect_text(out),
            }
        }
    }
}
