use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ApplicantId, PipelineId, StaffId, StepId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: PipelineId,
    pub name: String,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub pipeline_id: PipelineId,
    pub title: String,
    pub slug: String,
    pub ord: u32,
    pub is_final: bool,
}

/// Document key an applicant must have on file before entering a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRequirement {
    pub step_id: StepId,
    pub doc_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailKind {
    Text,
    Number,
    Date,
    Boolean,
    Select,
}

impl DetailKind {
    /// Check a captured value against the field type. Blank values always pass so a field
    /// can be cleared; the requirement gate treats them as missing.
    pub fn validate(self, value: &str, options: &[String]) -> Result<(), String> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(());
        }
        match self {
            DetailKind::Text => Ok(()),
            DetailKind::Number => value
                .parse::<f64>()
                .map(|_| ())
                .map_err(|_| format!("'{value}' is not a number")),
            DetailKind::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(|_| ())
                .map_err(|_| format!("'{value}' is not a YYYY-MM-DD date")),
            DetailKind::Boolean => match value.to_ascii_lowercase().as_str() {
                "true" | "false" | "yes" | "no" | "1" | "0" => Ok(()),
                _ => Err(format!("'{value}' is not a boolean")),
            },
            DetailKind::Select => {
                if options.iter().any(|option| option == value) {
                    Ok(())
                } else {
                    Err(format!("'{value}' is not one of {}", options.join(", ")))
                }
            }
        }
    }
}

/// Custom field collected from applicants on a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDynamicDetail {
    pub step_id: StepId,
    pub key: String,
    #[serde(rename = "type")]
    pub kind: DetailKind,
    pub required: bool,
    pub label: String,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantProfile {
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicant {
    pub id: ApplicantId,
    pub pipeline_id: PipelineId,
    pub current_step_id: StepId,
    pub profile: ApplicantProfile,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Applicant fields fixed at enrollment; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewApplicant {
    pub pipeline_id: PipelineId,
    pub first_step_id: StepId,
    pub profile: ApplicantProfile,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Append-only record of one committed move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantHistory {
    pub applicant_id: ApplicantId,
    pub from_step_id: StepId,
    pub to_step_id: StepId,
    pub by_admin_id: StaffId,
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantDetail {
    pub applicant_id: ApplicantId,
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantDocument {
    pub applicant_id: ApplicantId,
    pub doc_key: String,
    pub storage_ref: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Outcome of a completeness check, listing missing keys in requirement order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "missing", rename_all = "snake_case")]
pub enum Completeness {
    Complete,
    Missing(Vec<String>),
}

impl Completeness {
    pub fn from_missing(missing: Vec<String>) -> Self {
        if missing.is_empty() {
            Completeness::Complete
        } else {
            Completeness::Missing(missing)
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Completeness::Complete)
    }
}

/// Applicant with the step they sit on, captured details, and what blocks leaving the step.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicantProgress {
    pub applicant: Applicant,
    pub current_step: Step,
    /// Following step in display order; `None` on the last step.
    pub next_step: Option<Step>,
    pub details: Vec<ApplicantDetail>,
    pub blocking_details: Completeness,
}
