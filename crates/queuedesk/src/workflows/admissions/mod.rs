//! Admission pipelines: step administration, applicant enrollment, and gated step moves.

pub mod domain;
pub mod error;
pub mod gate;
pub mod memory;
pub mod pipeline;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Applicant, ApplicantDetail, ApplicantDocument, ApplicantHistory, ApplicantProfile,
    ApplicantProgress, Completeness, DetailKind, Pipeline, Step, StepDynamicDetail,
    StepRequirement,
};
pub use error::AdmissionError;
pub use gate::RequirementGate;
pub use memory::MemoryAdmissionStore;
pub use pipeline::{
    DetailSpec, NewPipeline, NewStep, PipelineCatalog, PipelineStepGraph, StepSchema, StepUpdate,
};
pub use repository::{
    AdmissionStore, AdvanceBlocked, ApplicantRecords, ApplicantRepository, PipelineRepository,
    StepChange, StepDraft,
};
pub use router::admission_router;
pub use service::{AdmissionWorkflowEngine, EnrollApplicant, MoveApplicant};
