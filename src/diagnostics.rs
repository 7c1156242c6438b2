//! Failure artifacts (screenshots and page markup) written next to the log

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::session::PageSession;

/// Writes one artifact per failure event into the logs directory
#[derive(Debug, Clone)]
pub struct Diagnostics {
    dir: PathBuf,
}

impl Diagnostics {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Save a screenshot named after the failing step, e.g. `click_next_page_error_1718000000.png`
    pub fn screenshot<S: PageSession + ?Sized>(&self, session: &mut S, step: &str) -> Option<PathBuf> {
        let timestamp = chrono::Utc::now().timestamp();
        let path = self.dir.join(format!("{}_error_{}.png", step, timestamp));
        let result = session
            .screenshot()
            .context("Failed to capture screenshot")
            .and_then(|png| self.write(&path, &png));
        self.report(result, path)
    }

    /// Save the current page markup, e.g. `page_source_page_3.html`
    pub fn page_source<S: PageSession + ?Sized>(
        &self,
        session: &mut S,
        page_number: usize,
    ) -> Option<PathBuf> {
        let path = self.dir.join(format!("page_source_page_{}.html", page_number));
        let result = session
            .page_source()
            .context("Failed to read page source")
            .and_then(|html| self.write(&path, html.as_bytes()));
        self.report(result, path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
    }

    fn report(&self, result: Result<()>, path: PathBuf) -> Option<PathBuf> {
        match result {
            Ok(()) => {
                info!("Saved diagnostic snapshot to {}", path.display());
                Some(path)
            }
            Err(e) => {
                error!("Could not save diagnostic snapshot {}: {:#}", path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotSession;

    #[test]
    fn test_page_source_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let diagnostics = Diagnostics::new(dir.path().join("logs"));
        let mut session =
            SnapshotSession::new(vec!["<html><body>empty</body></html>".to_string()], "a").unwrap();

        let path = diagnostics.page_source(&mut session, 3).unwrap();
        assert_eq!(path.file_name().unwrap(), "page_source_page_3.html");
        assert!(fs::read_to_string(path).unwrap().contains("empty"));
    }

    #[test]
    fn test_screenshot_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let diagnostics = Diagnostics::new(dir.path());
        let mut session = SnapshotSession::new(vec![String::new()], "a").unwrap();

        assert!(diagnostics.screenshot(&mut session, "click_next_page").is_none());
    }
}
