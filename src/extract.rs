//! Page extraction
//!
//! Turns the raw HTML of a Wikipedia article page into the flattened,
//! marker-wrapped text the parser understands, plus the page's outbound
//! link set.

use std::collections::{BTreeSet, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Edit-anchor residue left inside headings (`[editar]`).
static EDIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[editar\]").unwrap());

/// Navigation blocks dropped before any text or link is collected.
const REMOVED_SELECTOR: &str = "div#catlinks, div.printfooter, div.mw-authority-control";

/// Visible article content, in DOM order: the page heading plus the body
/// elements the flattened format cares about.
const CONTENT_SELECTOR: &str = "h1.firstHeading, div#mw-content-text h2, \
     div#mw-content-text h3, div#mw-content-text h4, div#mw-content-text p, \
     div#mw-content-text ul, div#mw-content-text li, div#mw-content-text span";

const LINK_SELECTOR: &str = "div#bodyContent a";

/// What one page contributes to the crawl.
#[derive(Debug, Clone)]
pub struct PageContent {
    /// Marker-wrapped plain text (`##h1##`, `==h2==`, `--h3--`, rest
    /// verbatim), newline-joined
    pub text: String,
    /// Every `href` under the body content, deduplicated and sorted,
    /// still relative when the page had them relative
    pub links: Vec<String>,
}

/// Flatten an article page.
///
/// Elements inside the removed navigation blocks contribute neither text
/// nor links. An element that is a descendant of an already-emitted
/// element is skipped, so a `li` never repeats the text its `ul` already
/// produced.
pub fn extract_page(html: &str) -> PageContent {
    let doc = Html::parse_document(html);
    let removed_sel = Selector::parse(REMOVED_SELECTOR).unwrap();
    let content_sel = Selector::parse(CONTENT_SELECTOR).unwrap();
    let link_sel = Selector::parse(LINK_SELECTOR).unwrap();

    let removed: HashSet<_> = doc.select(&removed_sel).map(|el| el.id()).collect();
    let in_removed = |el: ElementRef| {
        removed.contains(&el.id()) || el.ancestors().any(|a| removed.contains(&a.id()))
    };

    let mut links = BTreeSet::new();
    for anchor in doc.select(&link_sel) {
        if in_removed(anchor) {
            continue;
        }
        if let Some(href) = anchor.value().attr("href") {
            links.insert(href.to_string());
        }
    }

    let mut seen = HashSet::new();
    let mut parts: Vec<String> = Vec::new();
    for el in doc.select(&content_sel) {
        if in_removed(el) || seen.contains(&el.id()) {
            continue;
        }
        for desc in el.descendants() {
            seen.insert(desc.id());
        }
        let raw: String = el.text().collect();
        parts.push(match el.value().name() {
            "h1" => format!("##{raw}##"),
            "h2" => format!("=={raw}=="),
            "h3" => format!("--{raw}--"),
            _ => raw,
        });
    }

    let text = EDIT_RE.replace_all(&parts.join("\n"), "").into_owned();

    PageContent {
        text,
        links: links.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <h1 class="firstHeading">Valencia</h1>
        <div id="bodyContent">
          <div id="mw-content-text">
            <p>Ciudad de España.</p>
            <h2>Historia<span>[editar]</span></h2>
            <p>Fundada por los romanos.</p>
            <h3>Edad Media</h3>
            <ul><li>Conquista en 1238.</li></ul>
            <a href="/wiki/Turia">Turia</a>
            <a href="https://example.org/fuera">fuera</a>
            <a href="/wiki/Turia">repetido</a>
          </div>
          <div id="catlinks">
            <a href="/wiki/Categoría:Ciudades">Cat</a>
            <span>texto de categorías</span>
          </div>
        </div>
        </body></html>"#;

    #[test]
    fn wraps_headings_and_keeps_dom_order() {
        let page = extract_page(PAGE);
        let lines: Vec<&str> = page.text.split('\n').collect();
        assert_eq!(
            lines,
            vec![
                "##Valencia##",
                "Ciudad de España.",
                "==Historia==",
                "Fundada por los romanos.",
                "--Edad Media--",
                "Conquista en 1238.",
            ]
        );
    }

    #[test]
    fn edit_anchor_residue_is_stripped() {
        let page = extract_page(PAGE);
        assert!(!page.text.contains("[editar]"));
    }

    #[test]
    fn descendants_of_emitted_elements_are_deduplicated() {
        let page = extract_page(PAGE);
        // The li under the emitted ul must not repeat its text.
        assert_eq!(page.text.matches("Conquista en 1238.").count(), 1);
        // Same for the span under the emitted h2.
        assert_eq!(page.text.matches("Historia").count(), 1);
    }

    #[test]
    fn links_are_sorted_deduplicated_and_skip_removed_blocks() {
        let page = extract_page(PAGE);
        assert_eq!(page.links, vec!["/wiki/Turia", "https://example.org/fuera"]);
    }

    #[test]
    fn removed_blocks_contribute_no_text() {
        let page = extract_page(PAGE);
        assert!(!page.text.contains("texto de categorías"));
    }
}
