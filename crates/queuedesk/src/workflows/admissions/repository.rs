use chrono::{DateTime, Utc};

use super::domain::{
    Applicant, ApplicantDetail, ApplicantDocument, ApplicantHistory, NewApplicant, Pipeline, Step,
    StepDynamicDetail, StepRequirement,
};
use crate::ids::{ApplicantId, PipelineId, StaffId, StepId};
use crate::workflows::store::{Guarded, RepositoryError};

/// Step fields supplied when adding a step; the store assigns the id.
#[derive(Debug, Clone)]
pub struct StepDraft {
    pub pipeline_id: PipelineId,
    pub title: String,
    pub slug: String,
    pub ord: u32,
    pub is_final: bool,
}

/// Pipelines, their steps, and per-step requirement schemas.
pub trait PipelineRepository: Send + Sync {
    fn insert_pipeline(&self, name: String, year: i32) -> Result<Pipeline, RepositoryError>;
    fn pipeline(&self, id: PipelineId) -> Result<Option<Pipeline>, RepositoryError>;
    /// Steps of the pipeline ordered by `ord`.
    fn steps(&self, pipeline_id: PipelineId) -> Result<Vec<Step>, RepositoryError>;
    fn step(&self, id: StepId) -> Result<Option<Step>, RepositoryError>;
    /// Fails with `Conflict` when the ord or slug is taken within the pipeline.
    fn insert_step(&self, draft: StepDraft) -> Result<Step, RepositoryError>;
    fn update_step(&self, step: Step) -> Result<(), RepositoryError>;
    /// Remove the step with its requirement and detail schemas, only while no applicant sits
    /// on it. `Rejected` carries the number of occupants found.
    fn delete_step_if_unoccupied(&self, id: StepId)
        -> Result<Guarded<Step, usize>, RepositoryError>;
    fn requirements(&self, step_id: StepId) -> Result<Vec<StepRequirement>, RepositoryError>;
    fn replace_requirements(
        &self,
        step_id: StepId,
        doc_keys: Vec<String>,
    ) -> Result<(), RepositoryError>;
    fn dynamic_details(&self, step_id: StepId) -> Result<Vec<StepDynamicDetail>, RepositoryError>;
    fn replace_dynamic_details(
        &self,
        step_id: StepId,
        details: Vec<StepDynamicDetail>,
    ) -> Result<(), RepositoryError>;
}

/// A move to be committed by [`ApplicantRepository::advance`].
#[derive(Debug, Clone)]
pub struct StepChange {
    pub to_step_id: StepId,
    pub by_admin_id: StaffId,
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

/// Why a guarded [`ApplicantRepository::advance`] left the applicant where they were.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceBlocked {
    /// Another move committed first; carries the step the applicant now sits on.
    Moved(StepId),
    /// The target step was removed after the move was validated.
    TargetRemoved,
}

pub trait ApplicantRepository: Send + Sync {
    fn insert_applicant(&self, applicant: NewApplicant) -> Result<Applicant, RepositoryError>;
    fn applicant(&self, id: ApplicantId) -> Result<Option<Applicant>, RepositoryError>;

    /// Set the applicant's current step and append the history row as one unit, only while
    /// the applicant still sits on `expected_current` and the target step still exists.
    fn advance(
        &self,
        id: ApplicantId,
        expected_current: StepId,
        change: StepChange,
    ) -> Result<Guarded<Applicant, AdvanceBlocked>, RepositoryError>;

    /// History rows oldest first.
    fn history(&self, id: ApplicantId) -> Result<Vec<ApplicantHistory>, RepositoryError>;
}

/// Captured documents and dynamic-detail values keyed by (applicant, key).
pub trait ApplicantRecords: Send + Sync {
    fn has_document(&self, applicant_id: ApplicantId, doc_key: &str)
        -> Result<bool, RepositoryError>;
    fn detail_value(
        &self,
        applicant_id: ApplicantId,
        key: &str,
    ) -> Result<Option<String>, RepositoryError>;
    /// Insert or replace the single value stored for (applicant, key).
    fn upsert_detail(&self, detail: ApplicantDetail) -> Result<(), RepositoryError>;
    fn put_document(&self, document: ApplicantDocument) -> Result<(), RepositoryError>;
    fn details(&self, applicant_id: ApplicantId) -> Result<Vec<ApplicantDetail>, RepositoryError>;
}

/// Everything the admissions engine reads and writes.
pub trait AdmissionStore: PipelineRepository + ApplicantRepository + ApplicantRecords {}

impl<T> AdmissionStore for T where T: PipelineRepository + ApplicantRepository + ApplicantRecords {}
