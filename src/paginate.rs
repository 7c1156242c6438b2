//! Listing traversal: load, consent, page size, then extract page after page
//!
//! Only the initial load can fail the run. Every later step degrades: a
//! failed interaction is logged (with a diagnostic snapshot where useful) and
//! the harvest either continues or stops with what it has.

use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::extract::extract_page;
use crate::session::{Locator, PageSession, SessionError};
use crate::settle::{Pause, SettlePolicy};
use crate::types::Record;

pub const READY_SELECTOR: &str = "body";
pub const NEXT_SELECTOR: &str = "a[aria-label='Next']";
const FLOATING_MENU_SELECTOR: &str = "div[class*='floating-menu-class']";
const CLOSE_BUTTON_SELECTOR: &str = "button[aria-label='Close']";
const DROPDOWN_TOGGLE_SELECTOR: &str = "div button[class*='dropdown-toggle']";
const PAGE_SIZE_OPTION_SELECTOR: &str = "button[class='dropdown-item pt-1']";

fn consent_button() -> Locator {
    Locator::css("button").containing("Accept Cookies")
}

fn page_size_label() -> Locator {
    Locator::css("label").containing("Records per Page:")
}

#[derive(Debug, Error)]
pub enum PaginateError {
    #[error("listing page did not load within {0:?}")]
    LoadTimeout(Duration),
    #[error("could not open listing page: {0}")]
    Navigation(#[source] SessionError),
}

/// Why pagination ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// A page produced no records
    EmptyPage,
    /// The next control is disabled
    LastPage,
    /// The next control could not be found or clicked
    NextUnavailable,
    /// The session failed while reading a page
    SessionFailure(String),
    /// `max_pages` pages were read
    PageLimit,
}

/// Everything gathered across all pages
#[derive(Debug)]
pub struct Harvest {
    pub records: Vec<Record>,
    pub pages_visited: usize,
    pub stop: StopReason,
}

#[derive(Debug)]
enum State {
    Loading,
    ConsentCheck,
    PageSizeConfigured,
    ExtractingPage,
    NextPage,
    Done(StopReason),
}

pub struct Paginator<'a, S: PageSession + ?Sized> {
    session: &'a mut S,
    config: &'a Config,
    settle: &'a dyn SettlePolicy,
    diagnostics: &'a Diagnostics,
}

impl<'a, S: PageSession + ?Sized> Paginator<'a, S> {
    pub fn new(
        session: &'a mut S,
        config: &'a Config,
        settle: &'a dyn SettlePolicy,
        diagnostics: &'a Diagnostics,
    ) -> Self {
        Self {
            session,
            config,
            settle,
            diagnostics,
        }
    }

    /// Walk every listing page and return the records in page order
    pub fn run(mut self) -> Result<Harvest, PaginateError> {
        let mut records = Vec::new();
        let mut page_number = 0usize;
        let mut state = State::Loading;

        loop {
            state = match state {
                State::Loading => {
                    self.load()?;
                    State::ConsentCheck
                }
                State::ConsentCheck => {
                    self.accept_cookies();
                    State::PageSizeConfigured
                }
                State::PageSizeConfigured => {
                    self.set_records_per_page();
                    State::ExtractingPage
                }
                State::ExtractingPage => {
                    page_number += 1;
                    self.extract(page_number, &mut records)
                }
                State::NextPage if page_number >= self.config.max_pages => {
                    warn!("Reached the limit of {} pages, stopping.", self.config.max_pages);
                    State::Done(StopReason::PageLimit)
                }
                State::NextPage => self.next_page(),
                State::Done(stop) => {
                    info!(
                        "Pagination finished after {} page(s) with {} records ({:?}).",
                        page_number,
                        records.len(),
                        stop
                    );
                    return Ok(Harvest {
                        records,
                        pages_visited: page_number,
                        stop,
                    });
                }
            };
        }
    }

    fn load(&mut self) -> Result<(), PaginateError> {
        let url = &self.config.listing_url;
        info!("Navigating to {}", url);
        self.session.navigate(url).map_err(PaginateError::Navigation)?;

        let timeout = self.config.timeouts.load();
        match self.session.wait_for(&Locator::css(READY_SELECTOR), timeout) {
            Ok(_) => {
                info!("Page loaded successfully.");
                Ok(())
            }
            Err(e) if e.is_absence() => Err(PaginateError::LoadTimeout(timeout)),
            Err(e) => Err(PaginateError::Navigation(e)),
        }
    }

    fn accept_cookies(&mut self) {
        let button = match self
            .session
            .wait_for(&consent_button(), self.config.timeouts.consent())
        {
            Ok(button) => button,
            Err(e) if e.is_absence() => {
                info!("No cookie consent prompt found.");
                return;
            }
            Err(e) => {
                error!("Error looking for cookie consent prompt: {}", e);
                return;
            }
        };

        match self.session.click(&button) {
            Ok(()) => {
                info!("Accepted cookies.");
                self.settle.pause(Pause::AfterConsent);
            }
            Err(e) => error!("Error accepting cookies: {}", e),
        }
    }

    /// Dismiss a floating overlay that would swallow clicks
    fn close_floating_elements(&mut self) {
        let result = self
            .session
            .locate(&Locator::css(FLOATING_MENU_SELECTOR))
            .and_then(|menu| match menu {
                Some(menu) => self
                    .session
                    .locate_within(&menu, &Locator::css(CLOSE_BUTTON_SELECTOR))
                    .map(Some),
                None => Ok(None),
            });

        match result {
            Ok(Some(close)) => match self.session.click(&close) {
                Ok(()) => {
                    info!("Closed floating menu.");
                    self.settle.pause(Pause::AfterOverlayClosed);
                }
                Err(e) => error!("Error closing floating menu: {}", e),
            },
            Ok(None) | Err(SessionError::NoSuchElement(_)) => {
                info!("No floating menu found to close.")
            }
            Err(e) => error!("Error closing floating menu: {}", e),
        }
    }

    fn set_records_per_page(&mut self) {
        if let Err(e) = self.try_set_records_per_page() {
            error!("Error setting records per page: {}", e);
            self.diagnostics
                .screenshot(self.session, "set_records_per_page");
        }
    }

    fn try_set_records_per_page(&mut self) -> Result<(), SessionError> {
        let records = self.config.records_per_page;
        let timeout = self.config.timeouts.page_size();

        let label = self.session.wait_for(&page_size_label(), timeout)?;
        let container = self
            .session
            .parent(&label)?
            .ok_or_else(|| SessionError::NoSuchElement("records per page container".to_string()))?;
        let toggle = self
            .session
            .locate_within(&container, &Locator::css(DROPDOWN_TOGGLE_SELECTOR))?;
        self.session.click(&toggle)?;
        info!("Clicked on 'Records per Page' dropdown.");
        self.settle.pause(Pause::DropdownOpened);

        let option_locator = Locator::css(PAGE_SIZE_OPTION_SELECTOR).with_text(records.to_string());
        let option = self.session.wait_for(&option_locator, timeout)?;
        self.session.scroll_into_view(&option)?;
        self.close_floating_elements();
        self.session.script_click(&option)?;
        info!("Set 'Records per Page' to {} via JavaScript click.", records);
        self.settle.pause(Pause::PageSizeApplied);
        Ok(())
    }

    fn extract(&mut self, page_number: usize, records: &mut Vec<Record>) -> State {
        info!("Scraping page {}...", page_number);
        let page = match extract_page(self.session, &self.config.site_base_url, self.settle) {
            Ok(page) => page,
            Err(e) => {
                error!("An error occurred during scraping: {}", e);
                return State::Done(StopReason::SessionFailure(e.to_string()));
            }
        };

        if page.is_empty() {
            warn!("No jobs found on this page. Saving page source for debugging.");
            self.diagnostics.page_source(self.session, page_number);
            return State::Done(StopReason::EmptyPage);
        }

        records.extend(page);
        State::NextPage
    }

    fn next_page(&mut self) -> State {
        match self.try_click_next_page() {
            Ok(true) => State::ExtractingPage,
            Ok(false) => State::Done(StopReason::LastPage),
            Err(e) => {
                error!("Error clicking 'Next' page: {}", e);
                self.diagnostics.screenshot(self.session, "click_next_page");
                State::Done(StopReason::NextUnavailable)
            }
        }
    }

    /// Click "Next"; `Ok(false)` when its enclosing item is disabled
    fn try_click_next_page(&mut self) -> Result<bool, SessionError> {
        let next = self
            .session
            .wait_for(&Locator::css(NEXT_SELECTOR), self.config.timeouts.next())?;

        let classes = match self.session.parent(&next)? {
            Some(item) => self.session.attribute(&item, "class")?.unwrap_or_default(),
            None => String::new(),
        };
        if classes.contains("disabled") {
            info!("No more pages to navigate.");
            return Ok(false);
        }

        self.session.scroll_into_view(&next)?;
        self.session.script_click(&next)?;
        info!("Clicked on 'Next' page button.");
        self.settle.pause(Pause::AfterNextPage);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settle::RecordingSettle;
    use crate::snapshot::SnapshotSession;

    fn card(id: &str, station: &str) -> String {
        format!(
            r#"<div class="card border-0 ng-star-inserted">
                 <h2 class="jbOpen_title">Intern {id}</h2>
                 <span class="jbOpen_Id">Job ID : {id}</span>
                 <div class="card-body"><p>Duty Station : {station}</p></div>
               </div>"#
        )
    }

    fn listing(cards: &[String], next_disabled: Option<bool>) -> String {
        let pager = match next_disabled {
            Some(true) => r#"<ul><li class="page-item disabled"><a aria-label="Next">Next</a></li></ul>"#,
            Some(false) => r#"<ul><li class="page-item"><a aria-label="Next">Next</a></li></ul>"#,
            None => "",
        };
        format!(
            r#"<html><body>
                 <button>Accept Cookies</button>
                 <div class="records"><label>Records per Page:</label>
                   <div><button class="btn dropdown-toggle">10</button></div>
                 </div>
                 <button class="dropdown-item pt-1">10</button>
                 <button class="dropdown-item pt-1">50</button>
                 {}
                 {}
               </body></html>"#,
            cards.join("\n"),
            pager
        )
    }

    fn config(logs: &std::path::Path) -> Config {
        Config {
            logs_dir: logs.to_path_buf(),
            ..Default::default()
        }
    }

    fn harvest(pages: Vec<String>, config: &Config) -> (Result<Harvest, PaginateError>, Vec<Pause>) {
        let mut session = SnapshotSession::new(pages, NEXT_SELECTOR).unwrap();
        let settle = RecordingSettle::new();
        let diagnostics = Diagnostics::new(&config.logs_dir);
        let result = Paginator::new(&mut session, config, &settle, &diagnostics).run();
        (result, settle.pauses())
    }

    fn ids(harvest: &Harvest) -> Vec<&str> {
        harvest.records.iter().map(|r| r.job_id.as_str()).collect()
    }

    #[test]
    fn test_walks_pages_until_next_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let pages = vec![
            listing(&[card("1", "Geneva, Switzerland"), card("2", "Vienna")], Some(false)),
            listing(&[card("3", "Nairobi, Kenya")], Some(true)),
        ];

        let (result, pauses) = harvest(pages, &config);
        let harvest = result.unwrap();
        assert_eq!(ids(&harvest), vec!["1", "2", "3"]);
        assert_eq!(harvest.pages_visited, 2);
        assert_eq!(harvest.stop, StopReason::LastPage);
        assert_eq!(
            pauses,
            vec![
                Pause::AfterConsent,
                Pause::DropdownOpened,
                Pause::PageSizeApplied,
                Pause::BetweenCards,
                Pause::BetweenCards,
                Pause::AfterNextPage,
                Pause::BetweenCards,
            ]
        );
    }

    #[test]
    fn test_empty_page_keeps_earlier_records() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let pages = vec![
            listing(&[card("1", "Geneva")], Some(false)),
            listing(&[card("2", "Rome")], Some(false)),
            listing(&[], Some(false)),
        ];

        let (result, _) = harvest(pages, &config);
        let harvest = result.unwrap();
        assert_eq!(ids(&harvest), vec!["1", "2"]);
        assert_eq!(harvest.stop, StopReason::EmptyPage);
        assert!(dir.path().join("page_source_page_3.html").exists());
    }

    #[test]
    fn test_missing_next_control_stops_without_failing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let pages = vec![listing(&[card("1", "Geneva")], None)];

        let (result, _) = harvest(pages, &config);
        let harvest = result.unwrap();
        assert_eq!(ids(&harvest), vec!["1"]);
        assert_eq!(harvest.stop, StopReason::NextUnavailable);
    }

    #[test]
    fn test_missing_consent_and_page_size_are_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let bare = format!(
            "<html><body>{}<ul><li class=\"disabled\"><a aria-label=\"Next\">Next</a></li></ul></body></html>",
            card("7", "Bangkok, Thailand")
        );

        let (result, pauses) = harvest(vec![bare], &config);
        let harvest = result.unwrap();
        assert_eq!(ids(&harvest), vec!["7"]);
        assert_eq!(harvest.stop, StopReason::LastPage);
        assert_eq!(pauses, vec![Pause::BetweenCards]);
    }

    #[test]
    fn test_page_limit_stops_loop() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.max_pages = 1;
        let pages = vec![
            listing(&[card("1", "Geneva")], Some(false)),
            listing(&[card("2", "Rome")], Some(true)),
        ];

        let (result, _) = harvest(pages, &config);
        let harvest = result.unwrap();
        assert_eq!(ids(&harvest), vec!["1"]);
        assert_eq!(harvest.stop, StopReason::PageLimit);
    }

    #[test]
    fn test_load_timeout_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.timeouts.load_secs = 0.0;

        let mut session = crate::session::testing::BlankSession::default();
        let diagnostics = Diagnostics::new(dir.path());
        let result = Paginator::new(&mut session, &config, &crate::settle::NoSettle, &diagnostics).run();
        assert!(matches!(result, Err(PaginateError::LoadTimeout(_))));
    }
}
