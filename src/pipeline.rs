//! One end-to-end run: harvest, geocode, filter, write

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::applied::load_applied_ids;
use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::geocode::{GeocodeResolver, Geocoder};
use crate::paginate::{Paginator, StopReason};
use crate::session::{PageSession, SessionGuard};
use crate::settle::SettlePolicy;
use crate::types::{Record, UNKNOWN_COUNTRY};
use crate::workbook::{write_workbook, WriteSummary};

/// What a run did
#[derive(Debug, Default)]
pub struct RunReport {
    /// Set when the listing never loaded
    pub aborted: Option<String>,
    pub pages_visited: usize,
    pub stop: Option<StopReason>,
    pub applied: usize,
    pub unique_cities: usize,
    /// Enriched records, before applied filtering
    pub records: Vec<Record>,
    pub written: Option<WriteSummary>,
    pub output_path: Option<PathBuf>,
}

/// Run the whole harvest on `session`, which is quit before returning
pub fn run<S: PageSession>(
    session: S,
    geocoder: &dyn Geocoder,
    settle: &dyn SettlePolicy,
    config: &Config,
) -> Result<RunReport> {
    let applied = load_applied_ids(&config.applied_path);
    let mut report = RunReport {
        applied: applied.len(),
        ..Default::default()
    };

    let diagnostics = Diagnostics::new(&config.logs_dir);
    let harvest = {
        let mut session = SessionGuard::new(session);
        Paginator::new(&mut *session, config, settle, &diagnostics).run()
    };
    let harvest = match harvest {
        Ok(harvest) => harvest,
        Err(e) => {
            error!("Failed to load the listing page: {}", e);
            report.aborted = Some(e.to_string());
            return Ok(report);
        }
    };
    report.pages_visited = harvest.pages_visited;
    report.stop = Some(harvest.stop);
    let mut records = harvest.records;

    if records.is_empty() {
        warn!("No job data was scraped.");
        return Ok(report);
    }
    info!("Scraped {} job postings.", records.len());

    let cities: BTreeSet<String> = records
        .iter()
        .map(|r| r.geocode_query().to_string())
        .collect();
    report.unique_cities = cities.len();
    info!("Unique cities to geocode: {}", cities.len());

    let mut resolver = GeocodeResolver::from_config(geocoder, &config.geocode);
    let countries = resolver.resolve(&cities);

    for record in &mut records {
        let country = countries
            .get(record.geocode_query())
            .map(String::as_str)
            .unwrap_or(UNKNOWN_COUNTRY);
        record.country = Some(resolver.normalizer().normalize(country));
    }

    let summary = write_workbook(&records, &applied, &config.output_path)
        .with_context(|| format!("Failed to save {}", config.output_path.display()))?;
    info!(
        "Data saved to {} with separate sheets for each country.",
        config.output_path.display()
    );

    report.written = Some(summary);
    report.output_path = Some(config.output_path.clone());
    report.records = records;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::GeocodeError;
    use crate::paginate::NEXT_SELECTOR;
    use crate::session::testing::BlankSession;
    use crate::settle::NoSettle;
    use crate::snapshot::SnapshotSession;
    use calamine::{open_workbook_auto, Reader};
    use std::collections::HashMap;
    use std::fs;
    use std::path::Path;

    struct FixedGeocoder(HashMap<&'static str, &'static str>);

    impl Geocoder for FixedGeocoder {
        fn geocode(&self, query: &str) -> Result<Option<String>, GeocodeError> {
            match self.0.get(query) {
                Some(address) => Ok(Some(address.to_string())),
                None => Err(GeocodeError::Timeout(query.to_string())),
            }
        }
    }

    fn geocoder() -> FixedGeocoder {
        FixedGeocoder(HashMap::from([
            ("Geneva", "Geneva, Genève, Switzerland"),
            ("New York", "New York, United States of America"),
        ]))
    }

    fn card(id: &str, station: &str) -> String {
        format!(
            r#"<div class="card border-0 ng-star-inserted">
                 <h2 class="jbOpen_title">Intern {id}</h2>
                 <span class="jbOpen_Id">Job ID : {id}</span>
                 <div class="card-body">
                   <p>Duty Station : {station}</p>
                   <a class="btn btn-primary" href="/jobSearchDescription/{id}">View</a>
                 </div>
               </div>"#
        )
    }

    fn last_page(cards: &[String]) -> String {
        format!(
            r#"<html><body>{}<ul><li class="page-item disabled"><a aria-label="Next">Next</a></li></ul></body></html>"#,
            cards.join("\n")
        )
    }

    fn config(dir: &Path) -> Config {
        let mut config = Config {
            output_path: dir.join("UN_Internships.xlsx"),
            applied_path: dir.join("applied_intern.csv"),
            logs_dir: dir.join("logs"),
            ..Default::default()
        };
        config.geocode.interval_secs = 0.0;
        config
    }

    #[test]
    fn test_end_to_end_excludes_applied() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        fs::write(&config.applied_path, "Job ID\n67890\n").unwrap();

        let page = last_page(&[
            card("12345", "Geneva, Switzerland"),
            card("67890", "New York, United States"),
        ]);
        let session = SnapshotSession::new(vec![page], NEXT_SELECTOR).unwrap();

        let report = run(session, &geocoder(), &NoSettle, &config).unwrap();
        assert_eq!(report.applied, 1);
        assert_eq!(report.unique_cities, 2);
        assert_eq!(report.stop, Some(StopReason::LastPage));

        let summary = report.written.unwrap();
        assert_eq!(summary.excluded, 1);
        assert_eq!(summary.sheets.len(), 1);
        assert_eq!(summary.sheets[0].name, "Switzerland");
        assert_eq!(summary.sheets[0].rows, 1);

        let mut workbook = open_workbook_auto(&config.output_path).unwrap();
        let sheets = workbook.worksheets();
        assert_eq!(sheets.len(), 1);
        let (name, range) = &sheets[0];
        assert_eq!(name, "Switzerland");
        assert_eq!(range.height(), 2);
        let row: Vec<String> = range.rows().nth(1).unwrap().iter().map(|c| c.to_string()).collect();
        assert_eq!(row[1], "12345");
        assert_eq!(row[6], "Geneva");
        assert_eq!(row[7], "Switzerland");
        assert_eq!(row[11], "https://careers.un.org/jobSearchDescription/12345");
    }

    #[test]
    fn test_failed_lookup_lands_in_unknown_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        let page = last_page(&[card("1", "Geneva, Switzerland"), card("2", "Atlantis")]);
        let session = SnapshotSession::new(vec![page], NEXT_SELECTOR).unwrap();

        let report = run(session, &geocoder(), &NoSettle, &config).unwrap();
        let names: Vec<_> = report
            .written
            .unwrap()
            .sheets
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Switzerland", "Unknown"]);
        assert_eq!(report.records[1].country.as_deref(), Some("Unknown"));
    }

    #[test]
    fn test_no_records_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let session = SnapshotSession::new(vec![last_page(&[])], NEXT_SELECTOR).unwrap();

        let report = run(session, &geocoder(), &NoSettle, &config).unwrap();
        assert!(report.written.is_none());
        assert_eq!(report.stop, Some(StopReason::EmptyPage));
        assert!(!config.output_path.exists());
    }

    #[test]
    fn test_load_failure_aborts_and_quits_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.timeouts.load_secs = 0.0;

        let session = BlankSession::default();
        let quits = session.quit_calls.clone();

        let report = run(session, &geocoder(), &NoSettle, &config).unwrap();
        assert!(report.aborted.is_some());
        assert!(report.written.is_none());
        assert!(!config.output_path.exists());
        assert_eq!(quits.get(), 1);
    }
}
