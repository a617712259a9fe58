use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use super::domain::{
    Applicant, ApplicantDetail, ApplicantDocument, ApplicantHistory, NewApplicant, Pipeline, Step,
    StepDynamicDetail, StepRequirement,
};
use super::repository::{
    AdvanceBlocked, ApplicantRecords, ApplicantRepository, PipelineRepository, StepChange,
    StepDraft,
};
use crate::ids::{ApplicantId, PipelineId, StepId};
use crate::workflows::store::{lock, Guarded, RepositoryError};

#[derive(Debug, Default)]
struct AdmissionState {
    last_pipeline_id: u64,
    last_step_id: u64,
    last_applicant_id: u64,
    pipelines: BTreeMap<PipelineId, Pipeline>,
    steps: BTreeMap<StepId, Step>,
    requirements: HashMap<StepId, Vec<String>>,
    details_schema: HashMap<StepId, Vec<StepDynamicDetail>>,
    applicants: BTreeMap<ApplicantId, Applicant>,
    history: Vec<ApplicantHistory>,
    details: BTreeMap<(ApplicantId, String), ApplicantDetail>,
    documents: BTreeMap<(ApplicantId, String), ApplicantDocument>,
}

impl AdmissionState {
    fn step_clash(&self, candidate: &Step) -> Option<String> {
        self.steps
            .values()
            .filter(|step| step.pipeline_id == candidate.pipeline_id && step.id != candidate.id)
            .find_map(|step| {
                if step.ord == candidate.ord {
                    Some(format!("ord {} is already used in the pipeline", step.ord))
                } else if step.slug == candidate.slug {
                    Some(format!("slug '{}' is already used in the pipeline", step.slug))
                } else {
                    None
                }
            })
    }
}

/// Admission records behind one lock; `advance` updates the applicant and appends history
/// in the same critical section, and step removal checks occupancy under that lock.
#[derive(Debug, Default)]
pub struct MemoryAdmissionStore {
    state: Mutex<AdmissionState>,
}

impl PipelineRepository for MemoryAdmissionStore {
    fn insert_pipeline(&self, name: String, year: i32) -> Result<Pipeline, RepositoryError> {
        let mut state = lock(&self.state, "admission store")?;
        state.last_pipeline_id += 1;
        let pipeline = Pipeline {
            id: PipelineId(state.last_pipeline_id),
            name,
            year,
        };
        state.pipelines.insert(pipeline.id, pipeline.clone());
        Ok(pipeline)
    }

    fn pipeline(&self, id: PipelineId) -> Result<Option<Pipeline>, RepositoryError> {
        let state = lock(&self.state, "admission store")?;
        Ok(state.pipelines.get(&id).cloned())
    }

    fn steps(&self, pipeline_id: PipelineId) -> Result<Vec<Step>, RepositoryError> {
        let state = lock(&self.state, "admission store")?;
        let mut steps: Vec<Step> = state
            .steps
            .values()
            .filter(|step| step.pipeline_id == pipeline_id)
            .cloned()
            .collect();
        steps.sort_by_key(|step| (step.ord, step.id));
        Ok(steps)
    }

    fn step(&self, id: StepId) -> Result<Option<Step>, RepositoryError> {
        let state = lock(&self.state, "admission store")?;
        Ok(state.steps.get(&id).cloned())
    }

    fn insert_step(&self, draft: StepDraft) -> Result<Step, RepositoryError> {
        let mut state = lock(&self.state, "admission store")?;
        if !state.pipelines.contains_key(&draft.pipeline_id) {
            return Err(RepositoryError::NotFound);
        }
        let step = Step {
            id: StepId(state.last_step_id + 1),
            pipeline_id: draft.pipeline_id,
            title: draft.title,
            slug: draft.slug,
            ord: draft.ord,
            is_final: draft.is_final,
        };
        if let Some(clash) = state.step_clash(&step) {
            return Err(RepositoryError::Conflict(clash));
        }
        state.last_step_id = step.id.0;
        state.steps.insert(step.id, step.clone());
        Ok(step)
    }

    fn update_step(&self, step: Step) -> Result<(), RepositoryError> {
        let mut state = lock(&self.state, "admission store")?;
        if !state.steps.contains_key(&step.id) {
            return Err(RepositoryError::NotFound);
        }
        if let Some(clash) = state.step_clash(&step) {
            return Err(RepositoryError::Conflict(clash));
        }
        state.steps.insert(step.id, step);
        Ok(())
    }

    fn delete_step_if_unoccupied(
        &self,
        id: StepId,
    ) -> Result<Guarded<Step, usize>, RepositoryError> {
        let mut state = lock(&self.state, "admission store")?;
        if !state.steps.contains_key(&id) {
            return Ok(Guarded::Missing);
        }
        let occupants = state
            .applicants
            .values()
            .filter(|applicant| applicant.current_step_id == id)
            .count();
        if occupants > 0 {
            return Ok(Guarded::Rejected(occupants));
        }
        let Some(step) = state.steps.remove(&id) else {
            return Ok(Guarded::Missing);
        };
        state.requirements.remove(&id);
        state.details_schema.remove(&id);
        Ok(Guarded::Applied(step))
    }

    fn requirements(&self, step_id: StepId) -> Result<Vec<StepRequirement>, RepositoryError> {
        let state = lock(&self.state, "admission store")?;
        Ok(state
            .requirements
            .get(&step_id)
            .map(|keys| {
                keys.iter()
                    .map(|doc_key| StepRequirement {
                        step_id,
                        doc_key: doc_key.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn replace_requirements(
        &self,
        step_id: StepId,
        doc_keys: Vec<String>,
    ) -> Result<(), RepositoryError> {
        let mut state = lock(&self.state, "admission store")?;
        state.requirements.insert(step_id, doc_keys);
        Ok(())
    }

    fn dynamic_details(&self, step_id: StepId) -> Result<Vec<StepDynamicDetail>, RepositoryError> {
        let state = lock(&self.state, "admission store")?;
        Ok(state
            .details_schema
            .get(&step_id)
            .cloned()
            .unwrap_or_default())
    }

    fn replace_dynamic_details(
        &self,
        step_id: StepId,
        details: Vec<StepDynamicDetail>,
    ) -> Result<(), RepositoryError> {
        let mut state = lock(&self.state, "admission store")?;
        state.details_schema.insert(step_id, details);
        Ok(())
    }
}

impl ApplicantRepository for MemoryAdmissionStore {
    fn insert_applicant(&self, applicant: NewApplicant) -> Result<Applicant, RepositoryError> {
        let mut state = lock(&self.state, "admission store")?;
        state.last_applicant_id += 1;
        let stored = Applicant {
            id: ApplicantId(state.last_applicant_id),
            pipeline_id: applicant.pipeline_id,
            current_step_id: applicant.first_step_id,
            profile: applicant.profile,
            notes: applicant.notes,
            created_at: applicant.created_at,
        };
        state.applicants.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn applicant(&self, id: ApplicantId) -> Result<Option<Applicant>, RepositoryError> {
        let state = lock(&self.state, "admission store")?;
        Ok(state.applicants.get(&id).cloned())
    }

    fn advance(
        &self,
        id: ApplicantId,
        expected_current: StepId,
        change: StepChange,
    ) -> Result<Guarded<Applicant, AdvanceBlocked>, RepositoryError> {
        let mut state = lock(&self.state, "admission store")?;
        let target_exists = state.steps.contains_key(&change.to_step_id);
        let Some(applicant) = state.applicants.get_mut(&id) else {
            return Ok(Guarded::Missing);
        };
        if applicant.current_step_id != expected_current {
            return Ok(Guarded::Rejected(AdvanceBlocked::Moved(
                applicant.current_step_id,
            )));
        }
        if !target_exists {
            return Ok(Guarded::Rejected(AdvanceBlocked::TargetRemoved));
        }
        applicant.current_step_id = change.to_step_id;
        let moved = applicant.clone();
        state.history.push(ApplicantHistory {
            applicant_id: id,
            from_step_id: expected_current,
            to_step_id: change.to_step_id,
            by_admin_id: change.by_admin_id,
            note: change.note,
            at: change.at,
        });
        Ok(Guarded::Applied(moved))
    }

    fn history(&self, id: ApplicantId) -> Result<Vec<ApplicantHistory>, RepositoryError> {
        let state = lock(&self.state, "admission store")?;
        Ok(state
            .history
            .iter()
            .filter(|row| row.applicant_id == id)
            .cloned()
            .collect())
    }
}

impl ApplicantRecords for MemoryAdmissionStore {
    fn has_document(
        &self,
        applicant_id: ApplicantId,
        doc_key: &str,
    ) -> Result<bool, RepositoryError> {
        let state = lock(&self.state, "admission store")?;
        Ok(state
            .documents
            .contains_key(&(applicant_id, doc_key.to_string())))
    }

    fn detail_value(
        &self,
        applicant_id: ApplicantId,
        key: &str,
    ) -> Result<Option<String>, RepositoryError> {
        let state = lock(&self.state, "admission store")?;
        Ok(state
            .details
            .get(&(applicant_id, key.to_string()))
            .map(|detail| detail.value.clone()))
    }

    fn upsert_detail(&self, detail: ApplicantDetail) -> Result<(), RepositoryError> {
        let mut state = lock(&self.state, "admission store")?;
        state
            .details
            .insert((detail.applicant_id, detail.key.clone()), detail);
        Ok(())
    }

    fn put_document(&self, document: ApplicantDocument) -> Result<(), RepositoryError> {
        let mut state = lock(&self.state, "admission store")?;
        state
            .documents
            .insert((document.applicant_id, document.doc_key.clone()), document);
        Ok(())
    }

    fn details(&self, applicant_id: ApplicantId) -> Result<Vec<ApplicantDetail>, RepositoryError> {
        let state = lock(&self.state, "admission store")?;
        Ok(state
            .details
            .values()
            .filter(|detail| detail.applicant_id == applicant_id)
            .cloned()
            .collect())
    }
}
