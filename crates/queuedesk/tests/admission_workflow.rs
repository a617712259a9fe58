use chrono::{TimeZone, Utc};
use queuedesk::clock::{Clock, FixedClock};
use queuedesk::ids::StaffId;
use queuedesk::notifications::ChannelNotifier;
use queuedesk::workflows::admissions::{
    AdmissionError, AdmissionWorkflowEngine, ApplicantProfile, Completeness, DetailKind,
    DetailSpec, EnrollApplicant, MemoryAdmissionStore, MoveApplicant, NewPipeline, NewStep,
    PipelineCatalog,
};
use std::sync::Arc;

#[test]
fn applicant_walks_the_pipeline_once_gates_are_satisfied() {
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap(),
    ));
    let (notifier, mut rx) = ChannelNotifier::new(16);
    let store = Arc::new(MemoryAdmissionStore::default());
    let catalog = PipelineCatalog::new(store.clone());
    let engine = AdmissionWorkflowEngine::new(store, Arc::new(notifier), clock);

    let pipeline = catalog
        .create_pipeline(NewPipeline {
            name: "Scholarship".to_string(),
            year: 2025,
        })
        .expect("pipeline");
    let apply = catalog
        .add_step(
            pipeline.id,
            NewStep {
                title: "Apply".to_string(),
                ..NewStep::default()
            },
        )
        .expect("apply step");
    let essay = catalog
        .add_step(
            pipeline.id,
            NewStep {
                title: "Essay".to_string(),
                ..NewStep::default()
            },
        )
        .expect("essay step");
    catalog
        .set_dynamic_details(
            apply.id,
            vec![DetailSpec {
                key: "household_income".to_string(),
                kind: DetailKind::Number,
                required: true,
                label: Some("Household income".to_string()),
                options: Vec::new(),
            }],
        )
        .expect("details");
    catalog
        .set_requirements(essay.id, vec!["essay_pdf".to_string()])
        .expect("requirements");

    let applicant = engine
        .enroll(
            pipeline.id,
            EnrollApplicant {
                profile: ApplicantProfile {
                    full_name: "Grace Hopper".to_string(),
                    ..ApplicantProfile::default()
                },
                notes: Some("referred by counsellor".to_string()),
            },
        )
        .expect("enrolled");
    assert_eq!(applicant.current_step_id, apply.id);

    let request = || MoveApplicant {
        to_step_id: essay.id,
        by_admin_id: StaffId(4),
        note: None,
    };

    let err = engine
        .move_applicant(applicant.id, request())
        .expect_err("essay missing");
    assert!(matches!(err, AdmissionError::DocumentsIncomplete { .. }));

    engine
        .register_document(applicant.id, "essay_pdf", "uploads/essay.pdf".to_string())
        .expect("document");
    let err = engine
        .move_applicant(applicant.id, request())
        .expect_err("income missing");
    assert_eq!(err.missing(), Some(&["household_income".to_string()][..]));

    engine
        .set_detail(applicant.id, "household_income", "42000".to_string())
        .expect("detail");
    let moved = engine
        .move_applicant(applicant.id, request())
        .expect("moved");
    assert_eq!(moved.current_step_id, essay.id);

    let progress = engine.progress(applicant.id).expect("progress");
    assert_eq!(progress.current_step.slug, "essay");
    assert!(progress.next_step.is_none());
    assert_eq!(progress.blocking_details, Completeness::Complete);

    let event = rx.try_recv().expect("move notification");
    assert_eq!(event.channel, format!("pipeline.{}", pipeline.id));
    assert_eq!(event.event, "applicant.moved");
    assert!(rx.try_recv().is_err());

    let err = catalog.remove_step(essay.id).expect_err("occupied step");
    assert_eq!(err.kind(), "validation_error");
    catalog.remove_step(apply.id).expect("vacated step removed");
}
