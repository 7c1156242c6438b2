//! Page session over saved HTML pages
//!
//! Each page is a static document. Clicking an element that matches the
//! "advance" selector moves to the next saved page, which is how a listing's
//! next-page control is replayed offline.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

use crate::session::{ElementId, Locator, PageSession, SessionError};

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "footer", "form",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "label", "li", "main", "nav", "ol", "p",
    "pre", "section", "table", "tr", "ul",
];

pub struct SnapshotSession {
    pages: Vec<String>,
    current: usize,
    document: Html,
    /// Bumped on every page change so old handles read as stale
    generation: usize,
    advance: Selector,
    closed: bool,
}

impl SnapshotSession {
    pub fn new(pages: Vec<String>, advance_css: &str) -> Result<Self, SessionError> {
        let advance = parse_selector(advance_css)?;
        let document = Html::parse_document(pages.first().map(String::as_str).unwrap_or(""));
        Ok(Self {
            pages,
            current: 0,
            document,
            generation: 0,
            advance,
            closed: false,
        })
    }

    /// Load every `*.html` file of `dir`, ordered by file name
    pub fn from_dir(dir: &Path, advance_css: &str) -> Result<Self> {
        let mut paths: Vec<_> = fs::read_dir(dir)
            .with_context(|| format!("Failed to read snapshot directory: {}", dir.display()))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map_or(false, |ext| ext == "html"))
            .collect();
        paths.sort();

        if paths.is_empty() {
            bail!("No .html snapshots found in {}", dir.display());
        }

        let pages = paths
            .iter()
            .map(|p| {
                fs::read_to_string(p).with_context(|| format!("Failed to read {}", p.display()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(pages, advance_css)?)
    }

    #[cfg(test)]
    pub fn page_index(&self) -> usize {
        self.current
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn load_page(&mut self, index: usize) {
        self.current = index;
        self.document = Html::parse_document(&self.pages[index]);
        self.generation += 1;
        debug!("Snapshot session showing page {}", index + 1);
    }

    /// Handles are "<generation>:<position in document order>"
    fn handle(&self, element: ElementRef<'_>) -> ElementId {
        let position = self
            .document
            .tree
            .root()
            .descendants()
            .position(|node| node.id() == element.id())
            .unwrap_or_default();
        ElementId(format!("{}:{}", self.generation, position))
    }

    fn element(&self, handle: &ElementId) -> Result<ElementRef<'_>, SessionError> {
        self.ensure_open()?;
        let stale = || SessionError::StaleElement(handle.0.clone());
        let (generation, position) = handle.0.split_once(':').ok_or_else(stale)?;
        if generation.parse::<usize>().ok() != Some(self.generation) {
            return Err(stale());
        }
        let position: usize = position.parse().map_err(|_| stale())?;
        self.document
            .tree
            .root()
            .descendants()
            .nth(position)
            .and_then(ElementRef::wrap)
            .ok_or_else(stale)
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Protocol("session already closed".to_string()));
        }
        Ok(())
    }

    fn select(&self, root: Option<&ElementId>, css: &str) -> Result<Vec<ElementId>, SessionError> {
        self.ensure_open()?;
        let selector = parse_selector(css)?;
        let found = match root {
            Some(handle) => self
                .element(handle)?
                .select(&selector)
                .map(|e| self.handle(e))
                .collect(),
            None => self.document.select(&selector).map(|e| self.handle(e)).collect(),
        };
        Ok(found)
    }

    fn activate(&mut self, handle: &ElementId) -> Result<(), SessionError> {
        let advances = self.advance.matches(&self.element(handle)?);
        if advances && self.current + 1 < self.pages.len() {
            self.load_page(self.current + 1);
        }
        Ok(())
    }
}

fn parse_selector(css: &str) -> Result<Selector, SessionError> {
    Selector::parse(css).map_err(|e| SessionError::Protocol(format!("invalid selector {css}: {e}")))
}

/// Approximation of `innerText`: block elements break lines, whitespace collapses
pub fn inner_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&text.replace('\n', " ")),
            Node::Element(el) => {
                if el.name() == "br" {
                    out.push('\n');
                    continue;
                }
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = BLOCK_TAGS.contains(&el.name());
                if block {
                    out.push('\n');
                }
                collect_text(child_el, out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

impl PageSession for SnapshotSession {
    fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        debug!("Snapshot session navigating to {}", url);
        if !self.pages.is_empty() {
            self.load_page(0);
        }
        Ok(())
    }

    fn find_all(&mut self, css: &str) -> Result<Vec<ElementId>, SessionError> {
        self.select(None, css)
    }

    fn find_all_within(
        &mut self,
        parent: &ElementId,
        css: &str,
    ) -> Result<Vec<ElementId>, SessionError> {
        self.select(Some(parent), css)
    }

    fn text(&mut self, element: &ElementId) -> Result<String, SessionError> {
        Ok(inner_text(self.element(element)?))
    }

    fn attribute(
        &mut self,
        element: &ElementId,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        Ok(self.element(element)?.value().attr(name).map(str::to_string))
    }

    fn parent(&mut self, element: &ElementId) -> Result<Option<ElementId>, SessionError> {
        let parent = self.element(element)?.parent().and_then(ElementRef::wrap);
        Ok(parent.map(|p| self.handle(p)))
    }

    fn click(&mut self, element: &ElementId) -> Result<(), SessionError> {
        self.activate(element)
    }

    fn script_click(&mut self, element: &ElementId) -> Result<(), SessionError> {
        self.activate(element)
    }

    fn execute_script(
        &mut self,
        script: &str,
        args: &[&ElementId],
    ) -> Result<serde_json::Value, SessionError> {
        for arg in args {
            self.element(arg)?;
        }
        debug!("Snapshot session ignoring script: {}", script);
        Ok(serde_json::Value::Null)
    }

    fn screenshot(&mut self) -> Result<Vec<u8>, SessionError> {
        Err(SessionError::Protocol(
            "screenshots are not available for HTML snapshots".to_string(),
        ))
    }

    fn page_source(&mut self) -> Result<String, SessionError> {
        Ok(self.pages.get(self.current).cloned().unwrap_or_default())
    }

    fn quit(&mut self) -> Result<(), SessionError> {
        self.closed = true;
        Ok(())
    }

    /// A saved page never changes, so a single look decides the wait
    fn wait_for(&mut self, locator: &Locator, _timeout: Duration) -> Result<ElementId, SessionError> {
        self.locate(locator)?
            .ok_or_else(|| SessionError::Timeout(locator.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_ONE: &str = r##"<html><body>
        <div class="card-body"><p>Job Network : Management</p><p>Duty Station : Geneva</p></div>
        <ul><li class="page-item"><a aria-label="Next" href="#">Next</a></li></ul>
    </body></html>"##;
    const PAGE_TWO: &str = r#"<html><body><p>second</p></body></html>"#;

    fn session() -> SnapshotSession {
        SnapshotSession::new(
            vec![PAGE_ONE.to_string(), PAGE_TWO.to_string()],
            "a[aria-label='Next']",
        )
        .unwrap()
    }

    #[test]
    fn test_inner_text_breaks_block_elements() {
        let mut s = session();
        s.navigate("about:blank").unwrap();
        let body = s.find_all("div.card-body").unwrap();
        let text = s.text(&body[0]).unwrap();
        assert_eq!(text, "Job Network : Management\nDuty Station : Geneva");
    }

    #[test]
    fn test_parent_and_attribute() {
        let mut s = session();
        s.navigate("about:blank").unwrap();
        let next = s.find_all("a[aria-label='Next']").unwrap();
        let li = s.parent(&next[0]).unwrap().unwrap();
        assert_eq!(s.attribute(&li, "class").unwrap().as_deref(), Some("page-item"));
        assert_eq!(s.attribute(&li, "id").unwrap(), None);
    }

    #[test]
    fn test_clicking_advance_control_moves_to_next_page() {
        let mut s = session();
        s.navigate("about:blank").unwrap();
        let next = s.find_all("a[aria-label='Next']").unwrap();
        s.script_click(&next[0]).unwrap();
        assert_eq!(s.page_index(), 1);
        assert!(s.page_source().unwrap().contains("second"));
        // Handles from the previous page are stale
        assert!(matches!(s.text(&next[0]), Err(SessionError::StaleElement(_))));
    }

    #[test]
    fn test_wait_for_missing_element_times_out() {
        let mut s = session();
        s.navigate("about:blank").unwrap();
        let err = s
            .wait_for(&Locator::css("button").containing("Accept"), Duration::from_secs(10))
            .unwrap_err();
        assert!(matches!(err, SessionError::Timeout(_)));
    }

    #[test]
    fn test_from_dir_orders_by_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("02.html"), PAGE_TWO).unwrap();
        fs::write(dir.path().join("01.html"), PAGE_ONE).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let mut s = SnapshotSession::from_dir(dir.path(), "a[aria-label='Next']").unwrap();
        s.navigate("about:blank").unwrap();
        assert!(s.page_source().unwrap().contains("Job Network"));
    }

    #[test]
    fn test_quit_closes_session() {
        let mut s = session();
        s.navigate("about:blank").unwrap();
        s.quit().unwrap();
        assert!(s.is_closed());
        assert!(matches!(s.find_all("p"), Err(SessionError::Protocol(_))));
    }
}
