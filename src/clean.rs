//! Wiki HTML cleanup and markdown conversion.
//!
//! Strips navigation chrome from raw wiki pages, writes the cleaned HTML,
//! then extracts block-level text and writes it as markdown. Every cleanup
//! step is conditional on its target existing in the page; an absent
//! feature is a no-op, not an error. Files are processed independently so
//! one bad page never aborts the batch.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use ego_tree::{NodeId, NodeRef};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use crate::config::Config;

/// Structural chrome removed wholesale.
const CLUTTER_SELECTORS: &[&str] = &[
    ".navbox",
    ".printfooter",
    ".toc",
    ".mw-editsection",
    ".mw-parser-output .hlist",
];

/// Text nodes containing any of these markers are dropped outright.
/// Plain substring containment can over-delete prose that merely quotes a
/// marker; see DESIGN.md for why this matches the upstream corpus.
const JUNK_MARKERS: &[&str] = &["wiki.", "Retrieved from", "In other languages:"];

/// Elements whose text becomes one markdown block each.
const BLOCK_SELECTOR: &str = "p, h1, h2, h3, h4, h5, h6, li, pre, blockquote";

/// Clean every `.html` file in the raw directory, writing one cleaned HTML
/// file and one markdown file per input.
pub fn run_clean(config: &Config) -> Result<()> {
    let raw_dir = &config.paths.raw_html_dir;
    if !raw_dir.exists() {
        bail!("raw HTML directory does not exist: {}", raw_dir.display());
    }

    fs::create_dir_all(&config.paths.cleaned_html_dir).with_context(|| {
        format!(
            "creating cleaned HTML directory {}",
            config.paths.cleaned_html_dir.display()
        )
    })?;
    fs::create_dir_all(&config.paths.docs_dir)
        .with_context(|| format!("creating docs directory {}", config.paths.docs_dir.display()))?;

    let mut inputs: Vec<_> = fs::read_dir(raw_dir)
        .with_context(|| format!("reading {}", raw_dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("html"))
        .collect();
    inputs.sort();

    let mut cleaned = 0usize;
    let mut failed = 0usize;
    for path in &inputs {
        match clean_file(config, path) {
            Ok(()) => cleaned += 1,
            Err(e) => {
                eprintln!("Warning: failed to clean {}: {}", path.display(), e);
                failed += 1;
            }
        }
    }

    println!("clean");
    println!("  html files: {}", inputs.len());
    println!("  cleaned: {}", cleaned);
    if failed > 0 {
        println!("  failed: {}", failed);
    }
    println!("✅ HTML cleaned and converted to markdown.");
    Ok(())
}

fn clean_file(config: &Config, path: &Path) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow::anyhow!("invalid file name"))?;
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;

    let cleaned = clean_html(&raw);
    let cleaned_path = config.paths.cleaned_html_dir.join(file_name);
    fs::write(&cleaned_path, &cleaned)
        .with_context(|| format!("writing {}", cleaned_path.display()))?;

    let markdown = html_to_markdown(&cleaned);
    let md_path = config
        .paths
        .docs_dir
        .join(Path::new(file_name).with_extension("md"));
    fs::write(&md_path, markdown).with_context(|| format!("writing {}", md_path.display()))?;

    Ok(())
}

/// Apply all cleanup passes to a raw HTML page and serialize the result.
pub fn clean_html(raw: &str) -> String {
    let mut doc = Html::parse_document(raw);
    isolate_content_root(&mut doc);
    strip_clutter(&mut doc);
    strip_junk_text(&mut doc);
    remove_see_also_section(&mut doc);
    doc.root_element().html()
}

/// If the page has a `#mw-content-text` element, make it the sole child of
/// `<body>`; otherwise leave the document unchanged.
fn isolate_content_root(doc: &mut Html) {
    let content_sel = Selector::parse("#mw-content-text").expect("valid selector");
    let body_sel = Selector::parse("body").expect("valid selector");

    let Some(content_id) = doc.select(&content_sel).next().map(|el| el.id()) else {
        return;
    };
    let Some((body_id, child_ids)) = doc.select(&body_sel).next().map(|body| {
        let children: Vec<NodeId> = body.children().map(|child| child.id()).collect();
        (body.id(), children)
    }) else {
        return;
    };
    if content_id == body_id {
        return;
    }

    for id in child_ids {
        detach(doc, id);
    }
    if let Some(mut body) = doc.tree.get_mut(body_id) {
        body.append_id(content_id);
    }
}

fn strip_clutter(doc: &mut Html) {
    for css in CLUTTER_SELECTORS {
        let sel = Selector::parse(css).expect("valid selector");
        let ids: Vec<NodeId> = doc.select(&sel).map(|el| el.id()).collect();
        for id in ids {
            detach(doc, id);
        }
    }
}

fn strip_junk_text(doc: &mut Html) {
    let ids: Vec<NodeId> = doc
        .tree
        .root()
        .descendants()
        .filter(|node| match node.value() {
            Node::Text(text) => JUNK_MARKERS.iter().any(|marker| text.contains(marker)),
            _ => false,
        })
        .map(|node| node.id())
        .collect();
    for id in ids {
        detach(doc, id);
    }
}

/// Remove the "See also" heading and everything after it up to (but not
/// including) the next heading.
fn remove_see_also_section(doc: &mut Html) {
    let anchor_sel = Selector::parse("span#See_also").expect("valid selector");

    let mut doomed: Vec<NodeId> = Vec::new();
    {
        let Some(anchor) = doc.select(&anchor_sel).next() else {
            return;
        };
        let Some(heading) = anchor
            .ancestors()
            .find(|node| is_heading_node(node))
        else {
            return;
        };

        doomed.push(heading.id());
        let mut sibling = heading.next_sibling();
        while let Some(node) = sibling {
            if is_heading_node(&node) {
                break;
            }
            doomed.push(node.id());
            sibling = node.next_sibling();
        }
    }

    for id in doomed {
        detach(doc, id);
    }
}

fn detach(doc: &mut Html, id: NodeId) {
    if let Some(mut node) = doc.tree.get_mut(id) {
        node.detach();
    }
}

fn is_heading_node(node: &NodeRef<'_, Node>) -> bool {
    node.value()
        .as_element()
        .is_some_and(|el| matches!(el.name(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6"))
}

/// Extract block-level text from cleaned HTML, one block per element,
/// joined with blank lines.
pub fn html_to_markdown(html: &str) -> String {
    let doc = Html::parse_document(html);
    let block_sel = Selector::parse(BLOCK_SELECTOR).expect("valid selector");

    let mut blocks = Vec::new();
    for element in doc.select(&block_sel) {
        if has_block_ancestor(&element) {
            continue;
        }
        let mut buf = String::new();
        collect_text(*element, &mut buf);
        let block = if element.value().name() == "pre" {
            buf.trim().to_string()
        } else {
            normalize_whitespace(&buf)
        };
        if !block.is_empty() {
            blocks.push(block);
        }
    }

    // Pages without any block markup fall back to whole-document text.
    if blocks.is_empty() {
        let mut buf = String::new();
        collect_text(*doc.root_element(), &mut buf);
        let block = normalize_whitespace(&buf);
        if !block.is_empty() {
            blocks.push(block);
        }
    }

    blocks.join("\n\n")
}

fn is_block_tag(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li" | "pre" | "blockquote"
    )
}

/// True when a block element sits inside another block element (a `<p>` in
/// a `<li>`, say); the ancestor's text already covers it.
fn has_block_ancestor(element: &ElementRef<'_>) -> bool {
    element.ancestors().any(|node| {
        node.value()
            .as_element()
            .is_some_and(|el| is_block_tag(el.name()))
    })
}

fn collect_text(node: NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => out.push_str(text),
        Node::Element(element) => {
            if matches!(element.name(), "script" | "style" | "noscript" | "template") {
                return;
            }
            for child in node.children() {
                collect_text(child, out);
            }
        }
        _ => {
            for child in node.children() {
                collect_text(child, out);
            }
        }
    }
}

fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
