//! Entity catalog built from DOCTYPE internal subsets.
//!
//! DocBook manual sources pull their shared entities in through an external
//! parameter entity, typically:
//!
//! ```text
//! <!DOCTYPE refentry PUBLIC "..." "..." [
//! <!ENTITY % entities SYSTEM "custom-entities.ent"> %entities;
//! ]>
//! ```
//!
//! Any system identifier containing the marker substring
//! `custom-entities.ent` is redirected to one configured local file,
//! regardless of the path in the reference. Other SYSTEM identifiers resolve
//! relative to the referencing document. The external DTD subset named by a
//! PUBLIC identifier is never fetched.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use quick_xml::escape::resolve_predefined_entity;
use regex::Regex;

use crate::error::{IndexError, Result};

/// Marker substring that redirects an external entity reference to the
/// configured local entities file.
pub const ENTITY_FILE_MARKER: &str = "custom-entities.ent";

/// Nesting cap for parameter entities that declare further entities, and for
/// entities referenced from other entities' replacement text.
const MAX_SCAN_DEPTH: usize = 8;

static ENTITY_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"<!ENTITY\s+(?:(%)\s+)?([A-Za-z_][A-Za-z0-9._-]*)\s+(?:(SYSTEM)\s+)?(?:"([^"]*)"|'([^']*)')\s*>"#,
    )
    .expect("entity declaration pattern")
});

/// General entity definitions accumulated while parsing one document.
#[derive(Debug)]
pub struct EntityCatalog {
    entities_file: PathBuf,
    map: HashMap<String, String>,
}

impl EntityCatalog {
    pub fn new(entities_file: impl Into<PathBuf>) -> Self {
        EntityCatalog {
            entities_file: entities_file.into(),
            map: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Replacement text for a general entity, if declared.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }

    /// Scan a DOCTYPE internal subset for entity declarations.
    ///
    /// A SYSTEM identifier containing [`ENTITY_FILE_MARKER`] loads the
    /// configured entities file and is an error if that file cannot be read.
    /// Other SYSTEM identifiers resolve relative to `base_dir`; when the
    /// target does not exist the declaration is dropped, so only an actual
    /// reference to it fails later.
    pub fn scan_subset(&mut self, subset: &str, base_dir: &Path, origin: &str) -> Result<()> {
        self.collect(subset, base_dir, origin, 0)?;

        // Declarations may reference earlier or later ones; expand against
        // the completed raw map.
        let expanded: Vec<(String, String)> = self
            .map
            .iter()
            .map(|(name, value)| (name.clone(), self.expand_value(value, 0)))
            .collect();
        self.map.extend(expanded);
        Ok(())
    }

    fn collect(&mut self, subset: &str, base_dir: &Path, origin: &str, depth: usize) -> Result<()> {
        if depth > MAX_SCAN_DEPTH {
            return Err(IndexError::parse(
                origin,
                "entity declarations nested too deeply",
            ));
        }
        for caps in ENTITY_DECL.captures_iter(subset) {
            let parameter = caps.get(1).is_some();
            let name = caps[2].to_string();
            let external = caps.get(3).is_some();
            let value = caps
                .get(4)
                .or_else(|| caps.get(5))
                .map(|m| m.as_str())
                .unwrap_or("");

            if external {
                let redirected = value.contains(ENTITY_FILE_MARKER);
                let target = if redirected {
                    self.entities_file.clone()
                } else {
                    base_dir.join(value)
                };
                match fs::read_to_string(&target) {
                    Ok(content) if parameter => {
                        // Nested references resolve against the file that
                        // declares them, not the top document.
                        let nested_base = target.parent().unwrap_or(base_dir);
                        self.collect(&content, nested_base, origin, depth + 1)?;
                    }
                    Ok(content) => {
                        self.map.entry(name).or_insert(content);
                    }
                    Err(err) if redirected => {
                        return Err(IndexError::EntitiesFile {
                            path: target,
                            details: err.to_string(),
                        });
                    }
                    // Unresolved unless something actually references it.
                    Err(_) => {}
                }
            } else if parameter {
                // Internal parameter entities may carry further declarations.
                self.collect(value, base_dir, origin, depth + 1)?;
            } else {
                self.map.entry(name).or_insert_with(|| value.to_string());
            }
        }
        Ok(())
    }

    /// Decode character references, the predefined five, and references to
    /// other declared entities inside replacement text. Malformed or unknown
    /// references are kept verbatim.
    fn expand_value(&self, value: &str, depth: usize) -> String {
        if depth > MAX_SCAN_DEPTH || !value.contains('&') {
            return value.to_string();
        }
        let mut out = String::with_capacity(value.len());
        let mut rest = value;
        while let Some(amp) = rest.find('&') {
            out.push_str(&rest[..amp]);
            rest = &rest[amp..];
            let Some(semi) = rest.find(';') else {
                break;
            };
            let name = &rest[1..semi];
            if let Some(decoded) = decode_char_ref(name) {
                out.push(decoded);
            } else if let Some(predefined) = resolve_predefined_entity(name) {
                out.push_str(predefined);
            } else if let Some(replacement) = self.map.get(name) {
                out.push_str(&self.expand_value(replacement, depth + 1));
            } else {
                out.push_str(&rest[..=semi]);
            }
            rest = &rest[semi + 1..];
        }
        out.push_str(rest);
        out
    }
}

/// `#xHH` / `#DD` character reference, if that is what `name` is.
fn decode_char_ref(name: &str) -> Option<char> {
    let digits = name.strip_prefix('#')?;
    let code = match digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u32>().ok()?,
    };
    char::from_u32(code)
}
