//! Browser page-session capability
//!
//! The pagination driver and page extractor only talk to a [`PageSession`].
//! [`crate::chrome::ChromeSession`] drives a real browser and
//! [`crate::snapshot::SnapshotSession`] replays saved HTML.

use std::ops::{Deref, DerefMut};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{error, info};

/// How often bounded waits re-check the page
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Opaque handle to an element of the current page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementId(pub String);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no such element: {0}")]
    NoSuchElement(String),
    #[error("timed out waiting for {0}")]
    Timeout(String),
    #[error("stale element reference: {0}")]
    StaleElement(String),
    #[error("browser protocol error: {0}")]
    Protocol(String),
}

impl SessionError {
    /// "The element is not there", as opposed to the session misbehaving
    pub fn is_absence(&self) -> bool {
        matches!(self, SessionError::NoSuchElement(_) | SessionError::Timeout(_))
    }
}

/// Text condition applied on top of a CSS match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextMatch {
    Contains(String),
    Equals(String),
}

impl TextMatch {
    fn matches(&self, text: &str) -> bool {
        match self {
            TextMatch::Contains(needle) => text.contains(needle.as_str()),
            TextMatch::Equals(expected) => text.trim() == expected,
        }
    }
}

/// Structural query: a CSS selector, optionally narrowed by element text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub css: String,
    pub text: Option<TextMatch>,
}

impl Locator {
    pub fn css(css: impl Into<String>) -> Self {
        Self {
            css: css.into(),
            text: None,
        }
    }

    pub fn containing(mut self, needle: impl Into<String>) -> Self {
        self.text = Some(TextMatch::Contains(needle.into()));
        self
    }

    pub fn with_text(mut self, expected: impl Into<String>) -> Self {
        self.text = Some(TextMatch::Equals(expected.into()));
        self
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.text {
            None => write!(f, "{}", self.css),
            Some(TextMatch::Contains(t)) => write!(f, "{} containing '{}'", self.css, t),
            Some(TextMatch::Equals(t)) => write!(f, "{} with text '{}'", self.css, t),
        }
    }
}

pub trait PageSession {
    fn navigate(&mut self, url: &str) -> Result<(), SessionError>;

    /// All elements of the document matching `css`, in document order
    fn find_all(&mut self, css: &str) -> Result<Vec<ElementId>, SessionError>;

    /// Descendants of `parent` matching `css`, in document order
    fn find_all_within(
        &mut self,
        parent: &ElementId,
        css: &str,
    ) -> Result<Vec<ElementId>, SessionError>;

    /// Rendered text of an element, block elements separated by newlines
    fn text(&mut self, element: &ElementId) -> Result<String, SessionError>;

    fn attribute(&mut self, element: &ElementId, name: &str)
        -> Result<Option<String>, SessionError>;

    fn parent(&mut self, element: &ElementId) -> Result<Option<ElementId>, SessionError>;

    fn click(&mut self, element: &ElementId) -> Result<(), SessionError>;

    fn execute_script(
        &mut self,
        script: &str,
        args: &[&ElementId],
    ) -> Result<serde_json::Value, SessionError>;

    /// PNG bytes of the current viewport
    fn screenshot(&mut self) -> Result<Vec<u8>, SessionError>;

    fn page_source(&mut self) -> Result<String, SessionError>;

    fn quit(&mut self) -> Result<(), SessionError>;

    /// Click through script, bypassing overlays that would intercept a real click
    fn script_click(&mut self, element: &ElementId) -> Result<(), SessionError> {
        self.execute_script("arguments[0].click();", &[element])?;
        Ok(())
    }

    fn scroll_into_view(&mut self, element: &ElementId) -> Result<(), SessionError> {
        self.execute_script("arguments[0].scrollIntoView(true);", &[element])?;
        Ok(())
    }

    /// First element satisfying `locator`, if any
    fn locate(&mut self, locator: &Locator) -> Result<Option<ElementId>, SessionError> {
        let candidates = self.find_all(&locator.css)?;
        self.first_matching(candidates, locator)
    }

    /// First descendant of `parent` satisfying `locator`
    fn locate_within(
        &mut self,
        parent: &ElementId,
        locator: &Locator,
    ) -> Result<ElementId, SessionError> {
        let candidates = self.find_all_within(parent, &locator.css)?;
        self.first_matching(candidates, locator)?
            .ok_or_else(|| SessionError::NoSuchElement(locator.to_string()))
    }

    fn first_matching(
        &mut self,
        candidates: Vec<ElementId>,
        locator: &Locator,
    ) -> Result<Option<ElementId>, SessionError> {
        let Some(condition) = &locator.text else {
            return Ok(candidates.into_iter().next());
        };
        for candidate in candidates {
            let text = self.text(&candidate)?;
            if condition.matches(&text) {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// Poll until `locator` matches or `timeout` elapses
    fn wait_for(&mut self, locator: &Locator, timeout: Duration) -> Result<ElementId, SessionError> {
        let deadline = deadline_after(timeout);
        loop {
            match self.locate(locator) {
                Ok(Some(element)) => return Ok(element),
                Ok(None) | Err(SessionError::StaleElement(_)) => {}
                Err(e) => return Err(e),
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(SessionError::Timeout(locator.to_string()));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// `None` when `timeout` reaches past what `Instant` can represent
fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

/// Owns a session and quits it when dropped, whatever path the run took
pub struct SessionGuard<S: PageSession> {
    session: S,
}

impl<S: PageSession> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self { session }
    }
}

impl<S: PageSession> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: PageSession> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: PageSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        match self.session.quit() {
            Ok(()) => info!("Page session closed."),
            Err(e) => error!("Failed to close page session: {}", e),
        }
    }
}
