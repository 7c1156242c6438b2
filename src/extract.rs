//! Job card extraction from the rendered listing page

use thiserror::Error;
use tracing::{error, info, warn};

use crate::session::{ElementId, Locator, PageSession, SessionError};
use crate::settle::{Pause, SettlePolicy};
use crate::types::{Field, Record};

pub const CARD_SELECTOR: &str = "div[class*='card border-0 ng-star-inserted']";
const TITLE_SELECTOR: &str = "h2[class*='jbOpen_title']";
const JOB_ID_SELECTOR: &str = "span[class*='jbOpen_Id']";
const BODY_SELECTOR: &str = "div[class*='card-body']";
const LINK_SELECTOR: &str = "a[class*='btn btn-primary']";

/// Card body labels: (field, trigger substring, value separator).
/// Checked in order; the first trigger found in a line wins.
const LABELS: &[(Field, &str, &str)] = &[
    (Field::JobNetwork, "Job Network", "Job Network :"),
    (Field::JobFamily, "Job Family", "Job Family :"),
    (Field::CategoryAndLevel, "Category and Level", "Category and Level :"),
    (Field::DutyStation, "Duty Station", "Duty Station :"),
    (Field::Department, "Department/Office", "Department/Office :"),
    (Field::DatePosted, "Date Posted", "Date Posted :"),
    (Field::Deadline, "Deadline", "Deadline :"),
];

/// One line of a card body
#[derive(Debug, PartialEq, Eq)]
pub enum Line<'a> {
    Field(Field, &'a str),
    Unrecognized,
}

/// Classify a "Label : value" line
pub fn classify_line(line: &str) -> Line<'_> {
    for (field, trigger, separator) in LABELS {
        if line.contains(trigger) {
            let value = line.rsplit_once(separator).map_or(line, |(_, v)| v);
            return Line::Field(*field, value.trim());
        }
    }
    Line::Unrecognized
}

/// City part of a duty station: everything before the first comma
pub fn split_duty_station(duty_station: &str) -> &str {
    match duty_station.split_once(',') {
        Some((city, _)) => city.trim(),
        None => duty_station.trim(),
    }
}

/// Identifier from text such as "Job ID : 12345"
pub fn parse_job_id(text: &str) -> &str {
    text.rsplit(':').next().unwrap_or(text).trim()
}

/// Make a description link absolute against the site base URL
pub fn resolve_link(href: &str, base_url: &str) -> String {
    if href.starts_with('/') {
        format!("{}{}", base_url.trim_end_matches('/'), href)
    } else {
        href.to_string()
    }
}

#[derive(Debug, Error)]
pub enum CardError {
    #[error("card has no job id")]
    MissingJobId,
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Build a record from the lines of a card body
pub fn apply_body_lines(record: &mut Record, body_text: &str) {
    for line in body_text.lines() {
        let Line::Field(field, value) = classify_line(line) else {
            continue;
        };
        if let Some(slot) = record.slot_mut(field) {
            *slot = value.to_string();
        }
        if field == Field::DutyStation {
            record.city = split_duty_station(value).to_string();
        }
    }
}

/// Extract one card; any failure drops the whole card
pub fn extract_card<S: PageSession + ?Sized>(
    session: &mut S,
    card: &ElementId,
    base_url: &str,
) -> Result<Record, CardError> {
    let title_el = session.locate_within(card, &Locator::css(TITLE_SELECTOR))?;
    let title = session.text(&title_el)?.trim().to_string();

    let id_el = session.locate_within(card, &Locator::css(JOB_ID_SELECTOR))?;
    let job_id = parse_job_id(&session.text(&id_el)?).to_string();
    if job_id.is_empty() {
        return Err(CardError::MissingJobId);
    }

    let body = session.locate_within(card, &Locator::css(BODY_SELECTOR))?;
    let body_text = session.text(&body)?;

    let mut record = Record {
        title,
        job_id,
        ..Default::default()
    };
    apply_body_lines(&mut record, body_text.trim());

    // A missing link is not an error, the column just stays empty
    let href = match session.locate_within(&body, &Locator::css(LINK_SELECTOR)) {
        Ok(link) => session.attribute(&link, "href")?,
        Err(SessionError::NoSuchElement(_)) => None,
        Err(e) => return Err(e.into()),
    };
    match href {
        Some(href) => record.description_link = resolve_link(&href, base_url),
        None => warn!("Job Description link not found for Job ID: {}", record.job_id),
    }

    Ok(record)
}

/// Extract every card of the current page, in page order
pub fn extract_page<S: PageSession + ?Sized>(
    session: &mut S,
    base_url: &str,
    settle: &dyn SettlePolicy,
) -> Result<Vec<Record>, SessionError> {
    let cards = session.find_all(CARD_SELECTOR)?;
    info!("Found {} job elements on the current page.", cards.len());

    let mut records = Vec::with_capacity(cards.len());
    for card in &cards {
        match extract_card(session, card, base_url) {
            Ok(record) => {
                info!("Extracted: {} - Job ID: {}", record.title, record.job_id);
                records.push(record);
            }
            Err(e) => error!("Error extracting job details: {}", e),
        }
        settle.pause(Pause::BetweenCards);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settle::NoSettle;
    use crate::snapshot::SnapshotSession;

    const BASE: &str = "https://careers.un.org";

    fn card(title: &str, id: &str, body: &str) -> String {
        format!(
            r#"<div class="card border-0 ng-star-inserted">
                 <h2 class="jbOpen_title">{title}</h2>
                 <span class="jbOpen_Id">Job ID : {id}</span>
                 <div class="card-body">{body}</div>
               </div>"#
        )
    }

    fn page(cards: &[String]) -> SnapshotSession {
        let html = format!("<html><body>{}</body></html>", cards.join("\n"));
        let mut session = SnapshotSession::new(vec![html], "a[aria-label='Next']").unwrap();
        session.navigate("about:blank").unwrap();
        session
    }

    #[test]
    fn test_classify_recognized_labels() {
        assert_eq!(
            classify_line("Job Network : Information and Telecommunication Technology"),
            Line::Field(Field::JobNetwork, "Information and Telecommunication Technology")
        );
        assert_eq!(
            classify_line("Department/Office : Office for Outer Space Affairs"),
            Line::Field(Field::Department, "Office for Outer Space Affairs")
        );
        assert_eq!(
            classify_line("Deadline : Jun 30, 2025"),
            Line::Field(Field::Deadline, "Jun 30, 2025")
        );
    }

    #[test]
    fn test_classify_unrecognized_and_missing_separator() {
        assert_eq!(classify_line("Apply before it closes"), Line::Unrecognized);
        // Trigger present without the " :" separator keeps the whole line
        assert_eq!(
            classify_line("Date Posted: Jan 1"),
            Line::Field(Field::DatePosted, "Date Posted: Jan 1")
        );
    }

    #[test]
    fn test_classify_first_trigger_wins() {
        assert_eq!(
            classify_line("Job Family : Deadline management"),
            Line::Field(Field::JobFamily, "Deadline management")
        );
    }

    #[test]
    fn test_duty_station_split() {
        assert_eq!(split_duty_station("Geneva, Switzerland"), "Geneva");
        assert_eq!(split_duty_station("Vienna"), "Vienna");

        let mut record = Record::default();
        apply_body_lines(&mut record, "Duty Station : Vienna");
        assert_eq!(record.city, "Vienna");
        assert_eq!(record.geocode_query(), "Vienna");
    }

    #[test]
    fn test_parse_job_id_and_links() {
        assert_eq!(parse_job_id("Job ID : 12345"), "12345");
        assert_eq!(parse_job_id("12345"), "12345");
        assert_eq!(parse_job_id("Job ID :"), "");
        assert_eq!(
            resolve_link("/jobSearchDescription/1", BASE),
            "https://careers.un.org/jobSearchDescription/1"
        );
        assert_eq!(resolve_link("https://x.org/a", BASE), "https://x.org/a");
    }

    #[test]
    fn test_extract_full_card() {
        let body = r#"<p>Job Network : Management and Administration</p>
            <p>Job Family : Human Resources</p>
            <p>Category and Level : Internship, I</p>
            <p>Duty Station : Geneva, Switzerland</p>
            <p>Department/Office : Office of the United Nations at Geneva</p>
            <p>Date Posted : May 1, 2025</p>
            <p>Deadline : May 31, 2025</p>
            <a class="btn btn-primary" href="/jobSearchDescription/12345">View</a>"#;
        let mut session = page(&[card("HR Intern", "12345", body)]);

        let records = extract_page(&mut session, BASE, &NoSettle).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.title, "HR Intern");
        assert_eq!(r.job_id, "12345");
        assert_eq!(r.job_network, "Management and Administration");
        assert_eq!(r.job_family, "Human Resources");
        assert_eq!(r.category_and_level, "Internship, I");
        assert_eq!(r.duty_station, "Geneva, Switzerland");
        assert_eq!(r.city, "Geneva");
        assert_eq!(r.department, "Office of the United Nations at Geneva");
        assert_eq!(r.date_posted, "May 1, 2025");
        assert_eq!(r.deadline, "May 31, 2025");
        assert_eq!(r.description_link, "https://careers.un.org/jobSearchDescription/12345");
        assert_eq!(r.country, None);
    }

    #[test]
    fn test_missing_link_leaves_column_empty() {
        let mut session = page(&[card("Intern", "1", "<p>Duty Station : Nairobi</p>")]);
        let records = extract_page(&mut session, BASE, &NoSettle).unwrap();
        assert_eq!(records[0].description_link, "");
        assert_eq!(records[0].city, "Nairobi");
    }

    #[test]
    fn test_broken_card_is_dropped_others_kept() {
        let broken = r#"<div class="card border-0 ng-star-inserted">
                <span class="jbOpen_Id">Job ID : 999</span>
                <div class="card-body"></div></div>"#
            .to_string();
        let no_id = card("No id", "", "<p>Duty Station : Rome</p>");
        let mut session = page(&[
            card("First", "1", "<p>Duty Station : Bangkok, Thailand</p>"),
            broken,
            no_id,
            card("Last", "2", "<p>Duty Station : Santiago</p>"),
        ]);

        let records = extract_page(&mut session, BASE, &NoSettle).unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.job_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_empty_page_yields_nothing() {
        let mut session = page(&[]);
        assert!(extract_page(&mut session, BASE, &NoSettle).unwrap().is_empty());
    }
}
