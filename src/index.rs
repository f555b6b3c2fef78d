//! Metadata extraction and index construction.
//!
//! One pass over the source documents: parse, check that the declared id
//! matches the file it came from, pull out section/names/purpose, and group
//! one entry per declared name under its uppercase leading character.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{IndexError, Result};
use crate::parser::XmlLoader;
use crate::tree::Document;

/// One index entry. A page declaring several names yields one entry per
/// name, all sharing section, purpose and canonical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameEntry {
    /// The name this entry is filed under.
    pub name: String,
    /// Manual volume, e.g. "1" or "8".
    pub section: String,
    /// Whitespace-normalized one-line description.
    pub purpose: String,
    /// First declared name of the page; the page's identity for the
    /// distinct-page count.
    pub canonical: String,
}

/// Entries grouped by uppercase leading character. BTreeMap iteration gives
/// the ascending letter order the rendering needs; entries within a group
/// stay in insertion order until render time.
pub type Index = BTreeMap<char, Vec<NameEntry>>;

/// Metadata extracted from one source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMetadata {
    pub section: String,
    pub purpose: String,
    /// All declared names, in document order. Never empty.
    pub names: Vec<String>,
}

impl PageMetadata {
    pub fn canonical(&self) -> &str {
        &self.names[0]
    }
}

/// The root id must appear in the source path as `/<id>.`, i.e. the basename
/// starts with the declared id. Guards against stale or mismatched files.
pub fn check_identity(path: &Path, doc: &Document) -> Result<()> {
    let path_str = path.display().to_string();
    let Some(id) = doc.root.attr("id") else {
        return Err(IndexError::MissingId { path: path_str });
    };
    if path_str.contains(&format!("/{id}.")) {
        Ok(())
    } else {
        Err(IndexError::IdMismatch {
            id: id.to_string(),
            path: path_str,
        })
    }
}

/// Collapse all whitespace runs to single spaces and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn extract_metadata(doc: &Document, origin: &str) -> Result<PageMetadata> {
    let root = &doc.root;

    let section = root
        .find("refmeta/manvolnum")
        .ok_or_else(|| IndexError::MissingElement {
            element: "refmeta/manvolnum",
            origin: origin.to_string(),
        })?
        .text();

    let purpose = root
        .find("refnamediv/refpurpose")
        .ok_or_else(|| IndexError::MissingElement {
            element: "refnamediv/refpurpose",
            origin: origin.to_string(),
        })?
        .text();
    let purpose = normalize_whitespace(&purpose);

    let names: Vec<String> = root
        .find_all("refnamediv/refname")
        .iter()
        .map(|el| el.text())
        .collect();
    if names.is_empty() {
        return Err(IndexError::MissingElement {
            element: "refnamediv/refname",
            origin: origin.to_string(),
        });
    }
    if names.iter().any(|n| n.is_empty()) {
        return Err(IndexError::EmptyName {
            origin: origin.to_string(),
        });
    }

    Ok(PageMetadata {
        section,
        purpose,
        names,
    })
}

/// Uppercase leading character a name files under.
pub fn group_letter(name: &str) -> Option<char> {
    let first = name.chars().next()?;
    first.to_uppercase().next().or(Some(first))
}

/// Parse, validate and extract every source in the order given, grouping one
/// entry per declared name. Any failure aborts the whole run.
pub fn build_index(loader: &XmlLoader, paths: &[PathBuf]) -> Result<Index> {
    let mut index = Index::new();
    for path in paths {
        let doc = loader.parse_file(path)?;
        check_identity(path, &doc)?;
        let origin = path.display().to_string();
        let meta = extract_metadata(&doc, &origin)?;
        let canonical = meta.canonical().to_string();
        for name in &meta.names {
            let Some(letter) = group_letter(name) else {
                return Err(IndexError::EmptyName { origin });
            };
            index.entry(letter).or_default().push(NameEntry {
                name: name.clone(),
                section: meta.section.clone(),
                purpose: meta.purpose.clone(),
                canonical: canonical.clone(),
            });
        }
    }
    Ok(index)
}

/// Total entry count and distinct `(canonical, section)` page count.
pub fn totals(index: &Index) -> (usize, usize) {
    let count = index.values().map(Vec::len).sum();
    let pages: std::collections::HashSet<(&str, &str)> = index
        .values()
        .flatten()
        .map(|entry| (entry.canonical.as_str(), entry.section.as_str()))
        .collect();
    (count, pages.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(text: &str) -> Document {
        XmlLoader::new().parse_str(text, "test").unwrap()
    }

    fn loginctl() -> Document {
        parse(
            r#"<refentry id="loginctl">
                 <refmeta><manvolnum>1</manvolnum></refmeta>
                 <refnamediv>
                   <refname>loginctl</refname>
                   <refpurpose>Control the
                       elogind   login manager</refpurpose>
                 </refnamediv>
               </refentry>"#,
        )
    }

    #[test]
    fn test_identity_accepts_matching_basename() {
        let doc = parse(r#"<refentry id="foo"/>"#);
        assert!(check_identity(Path::new("man/foo.xml"), &doc).is_ok());
        assert!(check_identity(Path::new("/build/man/foo.7.xml"), &doc).is_ok());
    }

    #[test]
    fn test_identity_rejects_mismatch() {
        let doc = parse(r#"<refentry id="foo"/>"#);
        match check_identity(Path::new("man/bar.xml"), &doc) {
            Err(IndexError::IdMismatch { id, .. }) => assert_eq!(id, "foo"),
            other => panic!("expected id mismatch, got {other:?}"),
        }
        // No directory component, so "/foo." never occurs.
        assert!(check_identity(Path::new("foo.xml"), &doc).is_err());
    }

    #[test]
    fn test_identity_requires_id_attribute() {
        let doc = parse("<refentry/>");
        match check_identity(Path::new("man/foo.xml"), &doc) {
            Err(IndexError::MissingId { .. }) => (),
            other => panic!("expected missing id, got {other:?}"),
        }
    }

    #[test]
    fn test_extract_normalizes_purpose_whitespace() {
        let meta = extract_metadata(&loginctl(), "test").unwrap();
        assert_eq!(meta.section, "1");
        assert_eq!(meta.purpose, "Control the elogind login manager");
        assert_eq!(meta.names, vec!["loginctl"]);
        assert_eq!(meta.canonical(), "loginctl");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let once = normalize_whitespace("  a \t b\n\nc ");
        assert_eq!(once, "a b c");
        assert_eq!(normalize_whitespace(&once), once);
    }

    #[test]
    fn test_extract_collects_all_aliases() {
        let doc = parse(
            r#"<refentry id="systemd-logind.service">
                 <refmeta><manvolnum>8</manvolnum></refmeta>
                 <refnamediv>
                   <refname>systemd-logind.service</refname>
                   <refname>systemd-logind</refname>
                   <refpurpose>Login manager</refpurpose>
                 </refnamediv>
               </refentry>"#,
        );
        let meta = extract_metadata(&doc, "test").unwrap();
        assert_eq!(meta.names, vec!["systemd-logind.service", "systemd-logind"]);
        assert_eq!(meta.canonical(), "systemd-logind.service");
    }

    #[test]
    fn test_extract_missing_elements() {
        let doc = parse(r#"<refentry id="x"><refnamediv><refname>x</refname><refpurpose>p</refpurpose></refnamediv></refentry>"#);
        match extract_metadata(&doc, "test") {
            Err(IndexError::MissingElement { element, .. }) => {
                assert_eq!(element, "refmeta/manvolnum")
            }
            other => panic!("expected missing element, got {other:?}"),
        }

        let doc = parse(r#"<refentry id="x"><refmeta><manvolnum>1</manvolnum></refmeta><refnamediv><refpurpose>p</refpurpose></refnamediv></refentry>"#);
        match extract_metadata(&doc, "test") {
            Err(IndexError::MissingElement { element, .. }) => {
                assert_eq!(element, "refnamediv/refname")
            }
            other => panic!("expected missing element, got {other:?}"),
        }
    }

    #[test]
    fn test_group_letter_uppercases() {
        assert_eq!(group_letter("loginctl"), Some('L'));
        assert_eq!(group_letter("Xorg"), Some('X'));
        assert_eq!(group_letter("30-generator"), Some('3'));
        assert_eq!(group_letter(""), None);
    }

    fn write_page(dir: &TempDir, stem: &str, content: &str) -> PathBuf {
        let path = dir.path().join(format!("{stem}.xml"));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_build_index_groups_and_counts() {
        let dir = TempDir::new().unwrap();
        let a = write_page(
            &dir,
            "loginctl",
            r#"<refentry id="loginctl">
                 <refmeta><manvolnum>1</manvolnum></refmeta>
                 <refnamediv>
                   <refname>loginctl</refname>
                   <refpurpose>Control the systemd login manager</refpurpose>
                 </refnamediv>
               </refentry>"#,
        );
        let b = write_page(
            &dir,
            "systemd-logind.service",
            r#"<refentry id="systemd-logind.service">
                 <refmeta><manvolnum>8</manvolnum></refmeta>
                 <refnamediv>
                   <refname>systemd-logind.service</refname>
                   <refname>systemd-logind</refname>
                   <refpurpose>Login manager</refpurpose>
                 </refnamediv>
               </refentry>"#,
        );

        let index = build_index(&XmlLoader::new(), &[a, b]).unwrap();
        let letters: Vec<char> = index.keys().copied().collect();
        assert_eq!(letters, vec!['L', 'S']);
        assert_eq!(index[&'L'].len(), 1);
        assert_eq!(index[&'S'].len(), 2);
        assert_eq!(index[&'S'][0].canonical, "systemd-logind.service");
        assert_eq!(index[&'S'][1].name, "systemd-logind");
        assert_eq!(totals(&index), (3, 2));
    }

    #[test]
    fn test_build_index_aborts_on_first_error() {
        let dir = TempDir::new().unwrap();
        let good = write_page(
            &dir,
            "good",
            r#"<refentry id="good">
                 <refmeta><manvolnum>1</manvolnum></refmeta>
                 <refnamediv><refname>good</refname><refpurpose>fine</refpurpose></refnamediv>
               </refentry>"#,
        );
        let bad = write_page(&dir, "bad", r#"<refentry id="mismatched"/>"#);

        let err = build_index(&XmlLoader::new(), &[good, bad]).unwrap_err();
        match err {
            IndexError::IdMismatch { id, .. } => assert_eq!(id, "mismatched"),
            other => panic!("expected id mismatch, got {other:?}"),
        }
    }
}
