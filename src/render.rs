//! Output document rendering.
//!
//! Data assembly and presentation are decoupled: [`build_index`] produces
//! the grouped entries first, then [`render_index`] fills the fixed page
//! template in a single pass. [`assemble`] composes the two.

use std::path::PathBuf;

use crate::error::{IndexError, Result};
use crate::index::{self, Index, NameEntry, build_index};
use crate::parser::XmlLoader;
use crate::tree::{Document, Element, Node};

/// Separator between a citation and its purpose text.
const MDASH: &str = " \u{2014} ";

/// Fixed header and identity of the generated index page.
const TEMPLATE: &str = r#"<refentry id="elogind.index">

  <refentryinfo>
    <title>elogind.index</title>
    <productname>elogind</productname>

    <authorgroup>
      <author>
        <contrib>Developer</contrib>
        <firstname>Lennart</firstname>
        <surname>Poettering</surname>
        <email>lennart@poettering.net</email>
      </author>
      <author>
        <contrib>Developer</contrib>
        <firstname>Sven</firstname>
        <surname>Eden</surname>
        <email>sven.eden@gmx.de</email>
      </author>
    </authorgroup>
  </refentryinfo>

  <refmeta>
    <refentrytitle>elogind.index</refentrytitle>
    <manvolnum>7</manvolnum>
  </refmeta>

  <refnamediv>
    <refname>elogind.index</refname>
    <refpurpose>List all manpages from the elogind project</refpurpose>
  </refnamediv>
</refentry>
"#;

/// Trailing section; the counts paragraph is filled in at render time.
const SUMMARY: &str = r#"<refsect1>
  <title>See Also</title>
  <para>
    <citerefentry><refentrytitle>elogind.directives</refentrytitle><manvolnum>7</manvolnum></citerefentry>
  </para>

  <para id='counts'/>
</refsect1>
"#;

fn counts_text(count: usize, pages: usize) -> String {
    format!("This index contains {count} entries, referring to {pages} individual manual pages.")
}

/// Render a built index into the output document: template header, one
/// section per letter in ascending order, then the summary section.
pub fn render_index(loader: &XmlLoader, index: &Index) -> Result<Document> {
    let mut doc = loader.parse_str(TEMPLATE, "<index template>")?;
    for (letter, entries) in index {
        add_letter(&mut doc.root, *letter, entries);
    }
    add_summary(loader, &mut doc.root, index)?;
    Ok(doc)
}

/// Full pipeline: build the index from the given sources, then render it.
pub fn assemble(loader: &XmlLoader, paths: &[PathBuf]) -> Result<Document> {
    let index = build_index(loader, paths)?;
    render_index(loader, &index)
}

fn add_letter(root: &mut Element, letter: char, entries: &[NameEntry]) {
    let refsect1 = root.push_element("refsect1");
    refsect1.push_element("title").push_text(letter.to_string());
    let para = refsect1.push_element("para");

    // Stable sort: entries with equal names keep their input order.
    let mut sorted: Vec<&NameEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

    for entry in sorted {
        let cite = para.push_element("citerefentry");
        cite.push_element("refentrytitle")
            .push_text(entry.name.as_str());
        cite.push_element("manvolnum")
            .push_text(entry.section.as_str());
        para.push_text(format!("{MDASH}{}", entry.purpose));
        para.push_element("sbr");
    }
}

fn add_summary(loader: &XmlLoader, root: &mut Element, index: &Index) -> Result<()> {
    let (count, pages) = index::totals(index);

    let summary = loader.parse_str(SUMMARY, "<summary template>")?;
    let mut refsect1 = summary.root;
    let para = refsect1
        .find_descendant_mut(&|el| el.attr("id") == Some("counts"))
        .ok_or_else(|| IndexError::MissingElement {
            element: "para[@id='counts']",
            origin: "<summary template>".to_string(),
        })?;
    para.push_text(counts_text(count, pages));

    root.children.push(Node::Element(refsect1));
    Ok(())
}
