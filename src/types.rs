//! Job record types and the fixed workbook column schema

use serde::{Deserialize, Serialize};

/// Placeholder country used whenever geocoding cannot determine one
pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// One column of the output schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    JobId,
    JobNetwork,
    JobFamily,
    CategoryAndLevel,
    DutyStation,
    City,
    Country,
    Department,
    DatePosted,
    Deadline,
    DescriptionLink,
}

impl Field {
    /// All columns, in sheet order
    pub const ALL: [Field; 12] = [
        Field::Title,
        Field::JobId,
        Field::JobNetwork,
        Field::JobFamily,
        Field::CategoryAndLevel,
        Field::DutyStation,
        Field::City,
        Field::Country,
        Field::Department,
        Field::DatePosted,
        Field::Deadline,
        Field::DescriptionLink,
    ];

    /// Header text as written to the workbook
    pub fn header(&self) -> &'static str {
        match self {
            Field::Title => "Title",
            Field::JobId => "Job ID",
            Field::JobNetwork => "Job Network",
            Field::JobFamily => "Job Family",
            Field::CategoryAndLevel => "Category and Level",
            Field::DutyStation => "Duty Station",
            Field::City => "City",
            Field::Country => "Country",
            Field::Department => "Department/Office",
            Field::DatePosted => "Date Posted",
            Field::Deadline => "Deadline",
            Field::DescriptionLink => "Job Description Link",
        }
    }
}

/// One job listing as extracted from a card
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub title: String,
    pub job_id: String,
    pub job_network: String,
    pub job_family: String,
    pub category_and_level: String,
    pub duty_station: String,
    pub city: String,
    /// Filled in by enrichment; `None` until then
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub department: String,
    pub date_posted: String,
    pub deadline: String,
    pub description_link: String,
}

impl Record {
    /// Value of a column; an unset country reads as empty
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Title => &self.title,
            Field::JobId => &self.job_id,
            Field::JobNetwork => &self.job_network,
            Field::JobFamily => &self.job_family,
            Field::CategoryAndLevel => &self.category_and_level,
            Field::DutyStation => &self.duty_station,
            Field::City => &self.city,
            Field::Country => self.country.as_deref().unwrap_or(""),
            Field::Department => &self.department,
            Field::DatePosted => &self.date_posted,
            Field::Deadline => &self.deadline,
            Field::DescriptionLink => &self.description_link,
        }
    }

    /// Mutable access to the text columns filled from card lines
    pub fn slot_mut(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::JobNetwork => Some(&mut self.job_network),
            Field::JobFamily => Some(&mut self.job_family),
            Field::CategoryAndLevel => Some(&mut self.category_and_level),
            Field::DutyStation => Some(&mut self.duty_station),
            Field::Department => Some(&mut self.department),
            Field::DatePosted => Some(&mut self.date_posted),
            Field::Deadline => Some(&mut self.deadline),
            _ => None,
        }
    }

    /// Query string used for geocoding this record's location
    pub fn geocode_query(&self) -> &str {
        &self.city
    }

    /// Country column, defaulting to the unknown sentinel
    pub fn country_or_unknown(&self) -> &str {
        self.country.as_deref().unwrap_or(UNKNOWN_COUNTRY)
    }
}

/// Header row shared by every sheet
pub fn header_row() -> Vec<&'static str> {
    Field::ALL.iter().map(|f| f.header()).collect()
}
