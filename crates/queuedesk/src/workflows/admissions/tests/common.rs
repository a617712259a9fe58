use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::clock::FixedClock;
use crate::ids::{ApplicantId, PipelineId, StaffId, StepId};
use crate::notifications::{Notification, NotificationSink};
use crate::workflows::admissions::domain::{
    Applicant, ApplicantDetail, ApplicantDocument, ApplicantHistory, ApplicantProfile,
    DetailKind, NewApplicant, Pipeline, Step, StepDynamicDetail, StepRequirement,
};
use crate::workflows::admissions::memory::MemoryAdmissionStore;
use crate::workflows::admissions::pipeline::{DetailSpec, NewPipeline, NewStep, PipelineCatalog};
use crate::workflows::admissions::repository::{
    AdmissionStore, AdvanceBlocked, ApplicantRecords, ApplicantRepository, PipelineRepository,
    StepChange, StepDraft,
};
use crate::workflows::admissions::service::{
    AdmissionWorkflowEngine, EnrollApplicant, MoveApplicant,
};
use crate::workflows::store::{Guarded, RepositoryError};

pub(super) const ADMIN: StaffId = StaffId(9);

pub(super) fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, hour, minute, 0).unwrap()
}

#[derive(Default)]
pub(super) struct MemorySink {
    events: Mutex<Vec<Notification>>,
}

impl MemorySink {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("sink mutex poisoned").clone()
    }
}

impl NotificationSink for MemorySink {
    fn emit(&self, notification: Notification) {
        self.events
            .lock()
            .expect("sink mutex poisoned")
            .push(notification);
    }
}

/// Step ids of the seeded four-step pipeline.
#[derive(Debug, Clone, Copy)]
pub(super) struct Steps {
    pub(super) registration: StepId,
    pub(super) review: StepId,
    pub(super) interview: StepId,
    pub(super) decision: StepId,
}

pub(super) struct Harness<S: AdmissionStore + 'static> {
    pub(super) engine: AdmissionWorkflowEngine<S, MemorySink>,
    pub(super) catalog: PipelineCatalog<S>,
    pub(super) store: Arc<S>,
    pub(super) sink: Arc<MemorySink>,
    pub(super) clock: Arc<FixedClock>,
    pub(super) pipeline: PipelineId,
    pub(super) steps: Steps,
}

pub(super) fn harness() -> Harness<MemoryAdmissionStore> {
    harness_with(MemoryAdmissionStore::default())
}

/// Seeds "Undergraduate 2025": registration (school_name required, gpa optional),
/// document review (needs id_card and transcript; track required), interview, decision.
pub(super) fn harness_with<S: AdmissionStore + 'static>(store: S) -> Harness<S> {
    let store = Arc::new(store);
    let sink = Arc::new(MemorySink::default());
    let clock = Arc::new(FixedClock::new(at(9, 0)));
    let catalog = PipelineCatalog::new(store.clone());

    let pipeline = catalog
        .create_pipeline(NewPipeline {
            name: "Undergraduate".to_string(),
            year: 2025,
        })
        .expect("seed pipeline")
        .id;
    let add = |title: &str, is_final: bool| {
        catalog
            .add_step(
                pipeline,
                NewStep {
                    title: title.to_string(),
                    is_final,
                    ..NewStep::default()
                },
            )
            .expect("seed step")
            .id
    };
    let steps = Steps {
        registration: add("Registration", false),
        review: add("Document Review", false),
        interview: add("Interview", false),
        decision: add("Decision", true),
    };

    catalog
        .set_dynamic_details(
            steps.registration,
            vec![
                detail("school_name", DetailKind::Text, true, &[]),
                detail("gpa", DetailKind::Number, false, &[]),
            ],
        )
        .expect("seed registration details");
    catalog
        .set_dynamic_details(
            steps.review,
            vec![detail("track", DetailKind::Select, true, &["science", "arts"])],
        )
        .expect("seed review details");
    catalog
        .set_requirements(
            steps.review,
            vec!["id_card".to_string(), "transcript".to_string()],
        )
        .expect("seed review requirements");

    let engine = AdmissionWorkflowEngine::new(store.clone(), sink.clone(), clock.clone());
    Harness {
        engine,
        catalog,
        store,
        sink,
        clock,
        pipeline,
        steps,
    }
}

pub(super) fn detail(key: &str, kind: DetailKind, required: bool, options: &[&str]) -> DetailSpec {
    DetailSpec {
        key: key.to_string(),
        kind,
        required,
        label: None,
        options: options.iter().map(|option| option.to_string()).collect(),
    }
}

pub(super) fn enroll<S: AdmissionStore + 'static>(harness: &Harness<S>, name: &str) -> Applicant {
    harness
        .engine
        .enroll(
            harness.pipeline,
            EnrollApplicant {
                profile: ApplicantProfile {
                    full_name: name.to_string(),
                    ..ApplicantProfile::default()
                },
                notes: None,
            },
        )
        .expect("applicant enrolled")
}

pub(super) fn move_to(to_step_id: StepId) -> MoveApplicant {
    MoveApplicant {
        to_step_id,
        by_admin_id: ADMIN,
        note: None,
    }
}

/// Fill everything the applicant needs to leave registration for document review.
pub(super) fn ready_for_review<S: AdmissionStore + 'static>(
    harness: &Harness<S>,
    applicant: ApplicantId,
) {
    harness
        .engine
        .set_detail(applicant, "school_name", "Northside High".to_string())
        .expect("school_name");
    for doc_key in ["id_card", "transcript"] {
        harness
            .engine
            .register_document(applicant, doc_key, format!("uploads/{applicant}/{doc_key}.pdf"))
            .expect("document");
    }
}

/// Write committed by a competing request in the gap between validation and commit.
pub(super) enum Rival {
    /// Another move of the same applicant, landing before the next `advance`.
    Move(StepChange),
    /// A step removal, landing before the next `advance`.
    RemoveStep(StepId),
    /// A move of `applicant` off `from`, landing before the next step removal.
    MoveOnto {
        applicant: ApplicantId,
        from: StepId,
        change: StepChange,
    },
}

/// Store wrapper that commits an armed [`Rival`] just before the matching guarded write.
#[derive(Default)]
pub(super) struct RacingStore {
    pub(super) inner: MemoryAdmissionStore,
    rival: Mutex<Option<Rival>>,
}

impl RacingStore {
    pub(super) fn arm(&self, rival: Rival) {
        *self.rival.lock().expect("rival mutex poisoned") = Some(rival);
    }

    fn take(&self, before_removal: bool) -> Option<Rival> {
        let mut slot = self.rival.lock().expect("rival mutex poisoned");
        let matches = matches!(
            (slot.as_ref(), before_removal),
            (Some(Rival::MoveOnto { .. }), true)
                | (Some(Rival::Move(_) | Rival::RemoveStep(_)), false)
        );
        if matches {
            slot.take()
        } else {
            None
        }
    }
}

impl PipelineRepository for RacingStore {
    fn insert_pipeline(&self, name: String, year: i32) -> Result<Pipeline, RepositoryError> {
        self.inner.insert_pipeline(name, year)
    }

    fn pipeline(&self, id: PipelineId) -> Result<Option<Pipeline>, RepositoryError> {
        self.inner.pipeline(id)
    }

    fn steps(&self, pipeline_id: PipelineId) -> Result<Vec<Step>, RepositoryError> {
        self.inner.steps(pipeline_id)
    }

    fn step(&self, id: StepId) -> Result<Option<Step>, RepositoryError> {
        self.inner.step(id)
    }

    fn insert_step(&self, draft: StepDraft) -> Result<Step, RepositoryError> {
        self.inner.insert_step(draft)
    }

    fn update_step(&self, step: Step) -> Result<(), RepositoryError> {
        self.inner.update_step(step)
    }

    fn delete_step_if_unoccupied(
        &self,
        id: StepId,
    ) -> Result<Guarded<Step, usize>, RepositoryError> {
        if let Some(Rival::MoveOnto {
            applicant,
            from,
            change,
        }) = self.take(true)
        {
            self.inner.advance(applicant, from, change)?;
        }
        self.inner.delete_step_if_unoccupied(id)
    }

    fn requirements(&self, step_id: StepId) -> Result<Vec<StepRequirement>, RepositoryError> {
        self.inner.requirements(step_id)
    }

    fn replace_requirements(
        &self,
        step_id: StepId,
        doc_keys: Vec<String>,
    ) -> Result<(), RepositoryError> {
        self.inner.replace_requirements(step_id, doc_keys)
    }

    fn dynamic_details(&self, step_id: StepId) -> Result<Vec<StepDynamicDetail>, RepositoryError> {
        self.inner.dynamic_details(step_id)
    }

    fn replace_dynamic_details(
        &self,
        step_id: StepId,
        details: Vec<StepDynamicDetail>,
    ) -> Result<(), RepositoryError> {
        self.inner.replace_dynamic_details(step_id, details)
    }
}

impl ApplicantRepository for RacingStore {
    fn insert_applicant(&self, applicant: NewApplicant) -> Result<Applicant, RepositoryError> {
        self.inner.insert_applicant(applicant)
    }

    fn applicant(&self, id: ApplicantId) -> Result<Option<Applicant>, RepositoryError> {
        self.inner.applicant(id)
    }

    fn advance(
        &self,
        id: ApplicantId,
        expected_current: StepId,
        change: StepChange,
    ) -> Result<Guarded<Applicant, AdvanceBlocked>, RepositoryError> {
        match self.take(false) {
            Some(Rival::Move(rival)) => {
                self.inner.advance(id, expected_current, rival)?;
            }
            Some(Rival::RemoveStep(step)) => {
                self.inner.delete_step_if_unoccupied(step)?;
            }
            _ => {}
        }
        self.inner.advance(id, expected_current, change)
    }

    fn history(&self, id: ApplicantId) -> Result<Vec<ApplicantHistory>, RepositoryError> {
        self.inner.history(id)
    }
}

impl ApplicantRecords for RacingStore {
    fn has_document(
        &self,
        applicant_id: ApplicantId,
        doc_key: &str,
    ) -> Result<bool, RepositoryError> {
        self.inner.has_document(applicant_id, doc_key)
    }

    fn detail_value(
        &self,
        applicant_id: ApplicantId,
        key: &str,
    ) -> Result<Option<String>, RepositoryError> {
        self.inner.detail_value(applicant_id, key)
    }

    fn upsert_detail(&self, detail: ApplicantDetail) -> Result<(), RepositoryError> {
        self.inner.upsert_detail(detail)
    }

    fn put_document(&self, document: ApplicantDocument) -> Result<(), RepositoryError> {
        self.inner.put_document(document)
    }

    fn details(&self, applicant_id: ApplicantId) -> Result<Vec<ApplicantDetail>, RepositoryError> {
        self.inner.details(applicant_id)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
