use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::domain::{
    Applicant, ApplicantDetail, ApplicantDocument, ApplicantHistory, ApplicantProfile,
    ApplicantProgress, Completeness, NewApplicant, StepDynamicDetail,
};
use super::error::AdmissionError;
use super::gate::RequirementGate;
use super::pipeline::{load_graph, PipelineStepGraph};
use super::repository::{AdmissionStore, AdvanceBlocked, StepChange};
use crate::clock::Clock;
use crate::ids::{ApplicantId, PipelineId, StaffId, StepId};
use crate::notifications::{Notification, NotificationSink};
use crate::workflows::store::Guarded;

/// Enrollment payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnrollApplicant {
    #[serde(flatten)]
    pub profile: ApplicantProfile,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Step move requested by an admin.
#[derive(Debug, Clone, Deserialize)]
pub struct MoveApplicant {
    pub to_step_id: StepId,
    pub by_admin_id: StaffId,
    #[serde(default)]
    pub note: Option<String>,
}

/// Moves applicants through a pipeline's steps and captures their documents and details.
pub struct AdmissionWorkflowEngine<S, N> {
    store: Arc<S>,
    gate: RequirementGate<S>,
    notifier: Arc<N>,
    clock: Arc<dyn Clock>,
}

impl<S, N> AdmissionWorkflowEngine<S, N>
where
    S: AdmissionStore + 'static,
    N: NotificationSink + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, clock: Arc<dyn Clock>) -> Self {
        Self {
            gate: RequirementGate::new(store.clone()),
            store,
            notifier,
            clock,
        }
    }

    /// Create an applicant on the pipeline's first step.
    pub fn enroll(
        &self,
        pipeline_id: PipelineId,
        request: EnrollApplicant,
    ) -> Result<Applicant, AdmissionError> {
        let full_name = request.profile.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(AdmissionError::Validation(
                "applicant full_name is required".to_string(),
            ));
        }

        let graph = self.pipeline(pipeline_id)?;
        let first = graph.first_step().ok_or_else(|| {
            AdmissionError::Validation(format!("pipeline {pipeline_id} has no steps"))
        })?;

        let applicant = self.store.insert_applicant(NewApplicant {
            pipeline_id,
            first_step_id: first.id,
            profile: ApplicantProfile {
                full_name,
                ..request.profile
            },
            notes: blank_to_none(request.notes),
            created_at: self.clock.now(),
        })?;

        info!(
            applicant_id = %applicant.id,
            pipeline_id = %pipeline_id,
            step_id = %first.id,
            "applicant enrolled"
        );
        Ok(applicant)
    }

    /// Move the applicant to `request.to_step_id` once the target step's documents and the
    /// current step's required details are on file.
    pub fn move_applicant(
        &self,
        applicant_id: ApplicantId,
        request: MoveApplicant,
    ) -> Result<Applicant, AdmissionError> {
        let applicant = self.applicant(applicant_id)?;
        let graph = self.pipeline(applicant.pipeline_id)?;
        let target = request.to_step_id;
        if !graph.contains(target) {
            return Err(AdmissionError::InvalidStep {
                step_id: target,
                pipeline_id: applicant.pipeline_id,
            });
        }

        if let Completeness::Missing(missing) = self.gate.documents_for(applicant_id, target)? {
            warn!(
                applicant_id = %applicant_id,
                to_step_id = %target,
                missing = ?missing,
                "move blocked by documents"
            );
            return Err(AdmissionError::DocumentsIncomplete { missing });
        }

        let current = applicant.current_step_id;
        if let Completeness::Missing(missing) = self.gate.details_for(applicant_id, current)? {
            warn!(
                applicant_id = %applicant_id,
                step_id = %current,
                missing = ?missing,
                "move blocked by details"
            );
            return Err(AdmissionError::DetailsIncomplete { missing });
        }

        let change = StepChange {
            to_step_id: target,
            by_admin_id: request.by_admin_id,
            note: blank_to_none(request.note),
            at: self.clock.now(),
        };
        match self.store.advance(applicant_id, current, change)? {
            Guarded::Applied(moved) => {
                info!(
                    applicant_id = %applicant_id,
                    from_step_id = %current,
                    to_step_id = %target,
                    by_admin_id = %request.by_admin_id,
                    "applicant moved"
                );
                self.publish_move(&moved, current);
                Ok(moved)
            }
            Guarded::Rejected(AdvanceBlocked::Moved(actual)) => {
                debug!(
                    applicant_id = %applicant_id,
                    expected = %current,
                    actual = %actual,
                    "move lost a race"
                );
                Err(AdmissionError::Conflict { applicant_id })
            }
            Guarded::Rejected(AdvanceBlocked::TargetRemoved) => {
                debug!(
                    applicant_id = %applicant_id,
                    to_step_id = %target,
                    "target step removed before the move committed"
                );
                Err(AdmissionError::InvalidStep {
                    step_id: target,
                    pipeline_id: applicant.pipeline_id,
                })
            }
            Guarded::Missing => Err(AdmissionError::not_found("applicant", applicant_id.0)),
        }
    }

    /// Store a dynamic-detail value after checking it against the pipeline's schema.
    pub fn set_detail(
        &self,
        applicant_id: ApplicantId,
        key: &str,
        value: String,
    ) -> Result<ApplicantDetail, AdmissionError> {
        let applicant = self.applicant(applicant_id)?;
        let graph = self.pipeline(applicant.pipeline_id)?;
        let schema = self.declared_detail(&graph, key)?.ok_or_else(|| {
            AdmissionError::Validation(format!(
                "detail '{key}' is not declared in pipeline {}",
                applicant.pipeline_id
            ))
        })?;
        schema
            .kind
            .validate(&value, &schema.options)
            .map_err(|reason| AdmissionError::Validation(format!("{key}: {reason}")))?;

        let detail = ApplicantDetail {
            applicant_id,
            key: schema.key,
            value: value.trim().to_string(),
            updated_at: self.clock.now(),
        };
        self.store.upsert_detail(detail.clone())?;
        debug!(applicant_id = %applicant_id, key = %detail.key, "detail captured");
        Ok(detail)
    }

    /// Record that a document exists for the applicant.
    pub fn register_document(
        &self,
        applicant_id: ApplicantId,
        doc_key: &str,
        storage_ref: String,
    ) -> Result<ApplicantDocument, AdmissionError> {
        self.applicant(applicant_id)?;
        let doc_key = doc_key.trim();
        if doc_key.is_empty() {
            return Err(AdmissionError::Validation("doc_key is required".to_string()));
        }
        let storage_ref = storage_ref.trim().to_string();
        if storage_ref.is_empty() {
            return Err(AdmissionError::Validation(
                "storage_ref is required".to_string(),
            ));
        }

        let document = ApplicantDocument {
            applicant_id,
            doc_key: doc_key.to_string(),
            storage_ref,
            uploaded_at: self.clock.now(),
        };
        self.store.put_document(document.clone())?;
        debug!(applicant_id = %applicant_id, doc_key = %document.doc_key, "document registered");
        Ok(document)
    }

    pub fn applicant(&self, applicant_id: ApplicantId) -> Result<Applicant, AdmissionError> {
        self.store
            .applicant(applicant_id)?
            .ok_or_else(|| AdmissionError::not_found("applicant", applicant_id.0))
    }

    pub fn history(
        &self,
        applicant_id: ApplicantId,
    ) -> Result<Vec<ApplicantHistory>, AdmissionError> {
        self.applicant(applicant_id)?;
        Ok(self.store.history(applicant_id)?)
    }

    /// Applicant, their current and next step, and the details still blocking them from
    /// leaving the current one.
    pub fn progress(&self, applicant_id: ApplicantId) -> Result<ApplicantProgress, AdmissionError> {
        let applicant = self.applicant(applicant_id)?;
        let graph = self.pipeline(applicant.pipeline_id)?;
        let current_step = graph
            .step(applicant.current_step_id)
            .cloned()
            .ok_or_else(|| AdmissionError::not_found("step", applicant.current_step_id.0))?;
        let next_step = graph.next_after(current_step.id).cloned();
        let blocking_details = self.gate.details_for(applicant_id, current_step.id)?;
        Ok(ApplicantProgress {
            details: self.store.details(applicant_id)?,
            applicant,
            current_step,
            next_step,
            blocking_details,
        })
    }

    fn pipeline(&self, pipeline_id: PipelineId) -> Result<PipelineStepGraph, AdmissionError> {
        load_graph(self.store.as_ref(), pipeline_id)
    }

    fn declared_detail(
        &self,
        graph: &PipelineStepGraph,
        key: &str,
    ) -> Result<Option<StepDynamicDetail>, AdmissionError> {
        for step in graph.steps() {
            if let Some(detail) = self
                .store
                .dynamic_details(step.id)?
                .into_iter()
                .find(|detail| detail.key == key)
            {
                return Ok(Some(detail));
            }
        }
        Ok(None)
    }

    fn publish_move(&self, applicant: &Applicant, from: StepId) {
        self.notifier.emit(Notification::new(
            format!("pipeline.{}", applicant.pipeline_id),
            "applicant.moved",
            json!({
                "applicant_id": applicant.id,
                "from_step_id": from,
                "to_step_id": applicant.current_step_id,
            }),
            self.clock.now(),
        ));
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
