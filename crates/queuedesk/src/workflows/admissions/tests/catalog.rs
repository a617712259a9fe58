use super::common::*;
use crate::ids::StepId;
use crate::workflows::admissions::domain::DetailKind;
use crate::workflows::admissions::error::AdmissionError;
use crate::workflows::admissions::pipeline::{NewPipeline, NewStep, StepUpdate};
use crate::workflows::admissions::repository::StepChange;

#[test]
fn steps_default_to_next_ord_and_slugified_title() {
    let harness = harness();
    let graph = harness.catalog.pipeline(harness.pipeline).expect("graph");

    let slugs: Vec<&str> = graph.steps().iter().map(|step| step.slug.as_str()).collect();
    assert_eq!(
        slugs,
        vec!["registration", "document-review", "interview", "decision"]
    );
    let ords: Vec<u32> = graph.steps().iter().map(|step| step.ord).collect();
    assert_eq!(ords, vec![1, 2, 3, 4]);
    assert_eq!(
        graph.first_step().map(|step| step.id),
        Some(harness.steps.registration)
    );
    assert!(graph.steps().last().is_some_and(|step| step.is_final));
}

#[test]
fn duplicate_ord_or_slug_is_rejected() {
    let harness = harness();

    let err = harness
        .catalog
        .add_step(
            harness.pipeline,
            NewStep {
                title: "Medical".to_string(),
                ord: Some(2),
                ..NewStep::default()
            },
        )
        .expect_err("ord taken");
    assert!(matches!(err, AdmissionError::Validation(ref message) if message.contains("ord 2")));

    let err = harness
        .catalog
        .add_step(
            harness.pipeline,
            NewStep {
                title: "Interview".to_string(),
                ..NewStep::default()
            },
        )
        .expect_err("slug taken");
    assert!(matches!(err, AdmissionError::Validation(ref message) if message.contains("interview")));

    let err = harness
        .catalog
        .update_step(
            harness.steps.decision,
            StepUpdate {
                ord: Some(1),
                ..StepUpdate::default()
            },
        )
        .expect_err("update onto taken ord");
    assert!(matches!(err, AdmissionError::Validation(_)));
}

#[test]
fn update_step_changes_only_given_fields() {
    let harness = harness();
    let updated = harness
        .catalog
        .update_step(
            harness.steps.interview,
            StepUpdate {
                title: Some("Panel Interview".to_string()),
                ord: Some(30),
                ..StepUpdate::default()
            },
        )
        .expect("update");

    assert_eq!(updated.title, "Panel Interview");
    assert_eq!(updated.slug, "interview");
    assert_eq!(updated.ord, 30);
    assert!(!updated.is_final);

    let graph = harness.catalog.pipeline(harness.pipeline).expect("graph");
    assert_eq!(
        graph.steps().last().map(|step| step.id),
        Some(harness.steps.interview)
    );
}

#[test]
fn occupied_step_cannot_be_removed() {
    let harness = harness();
    enroll(&harness, "Ada");

    let err = harness
        .catalog
        .remove_step(harness.steps.registration)
        .expect_err("occupied");
    assert!(matches!(err, AdmissionError::Validation(ref message) if message.contains("1 applicant")));

    harness
        .catalog
        .remove_step(harness.steps.interview)
        .expect("empty step removed");
    let graph = harness.catalog.pipeline(harness.pipeline).expect("graph");
    let ords: Vec<u32> = graph.steps().iter().map(|step| step.ord).collect();
    assert_eq!(ords, vec![1, 2, 4]);

    let err = harness
        .catalog
        .remove_step(harness.steps.interview)
        .expect_err("already removed");
    assert!(matches!(err, AdmissionError::NotFound { entity: "step", .. }));
}

#[test]
fn removal_is_refused_when_a_move_lands_on_the_step_first() {
    let harness = harness_with(RacingStore::default());
    let applicant = enroll(&harness, "Ada");
    ready_for_review(&harness, applicant.id);
    harness.store.arm(Rival::MoveOnto {
        applicant: applicant.id,
        from: harness.steps.registration,
        change: StepChange {
            to_step_id: harness.steps.interview,
            by_admin_id: ADMIN,
            note: None,
            at: at(9, 5),
        },
    });

    let err = harness
        .catalog
        .remove_step(harness.steps.interview)
        .expect_err("step became occupied");
    assert!(matches!(err, AdmissionError::Validation(ref message) if message.contains("1 applicant")));

    let graph = harness.catalog.pipeline(harness.pipeline).expect("graph");
    assert!(graph.contains(harness.steps.interview));
    let progress = harness.engine.progress(applicant.id).expect("progress");
    assert_eq!(progress.current_step.id, harness.steps.interview);
}

#[test]
fn requirements_are_trimmed_and_deduplicated() {
    let harness = harness();
    let requirements = harness
        .catalog
        .set_requirements(
            harness.steps.interview,
            vec![
                " passport ".to_string(),
                "".to_string(),
                "passport".to_string(),
                "photo".to_string(),
            ],
        )
        .expect("requirements");

    let keys: Vec<&str> = requirements
        .iter()
        .map(|requirement| requirement.doc_key.as_str())
        .collect();
    assert_eq!(keys, vec!["passport", "photo"]);
}

#[test]
fn dynamic_detail_schema_is_validated() {
    let harness = harness();

    let err = harness
        .catalog
        .set_dynamic_details(
            harness.steps.interview,
            vec![
                detail("score", DetailKind::Number, true, &[]),
                detail("score", DetailKind::Text, false, &[]),
            ],
        )
        .expect_err("duplicate key");
    assert!(matches!(err, AdmissionError::Validation(_)));

    let err = harness
        .catalog
        .set_dynamic_details(
            harness.steps.interview,
            vec![detail("panel", DetailKind::Select, true, &[])],
        )
        .expect_err("select without options");
    assert!(matches!(err, AdmissionError::Validation(ref message) if message.contains("panel")));

    let details = harness
        .catalog
        .set_dynamic_details(
            harness.steps.interview,
            vec![detail("score", DetailKind::Number, true, &[])],
        )
        .expect("schema");
    assert_eq!(details[0].label, "score");
    assert_eq!(details[0].step_id, harness.steps.interview);

    let schema = harness
        .catalog
        .step_schema(harness.steps.review)
        .expect("schema");
    assert_eq!(schema.requirements.len(), 2);
    assert_eq!(schema.details[0].key, "track");
}

#[test]
fn pipeline_needs_a_name() {
    let harness = harness();
    let err = harness
        .catalog
        .create_pipeline(NewPipeline {
            name: "  ".to_string(),
            year: 2026,
        })
        .expect_err("blank name");
    assert!(matches!(err, AdmissionError::Validation(_)));

    let err = harness
        .catalog
        .set_requirements(StepId(404), vec!["passport".to_string()])
        .expect_err("unknown step");
    assert_eq!(err.kind(), "not_found");
}
