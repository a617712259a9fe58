use std::sync::Arc;

use super::domain::Completeness;
use super::repository::AdmissionStore;
use crate::ids::{ApplicantId, StepId};
use crate::workflows::store::RepositoryError;

/// Answers whether an applicant satisfies a step's documents or required details.
pub struct RequirementGate<S> {
    store: Arc<S>,
}

impl<S> RequirementGate<S>
where
    S: AdmissionStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Document keys of `step_id` the applicant has not uploaded.
    pub fn documents_for(
        &self,
        applicant_id: ApplicantId,
        step_id: StepId,
    ) -> Result<Completeness, RepositoryError> {
        let mut missing = Vec::new();
        for requirement in self.store.requirements(step_id)? {
            if !self.store.has_document(applicant_id, &requirement.doc_key)? {
                missing.push(requirement.doc_key);
            }
        }
        Ok(Completeness::from_missing(missing))
    }

    /// Required detail keys of `step_id` with no value or a blank one.
    pub fn details_for(
        &self,
        applicant_id: ApplicantId,
        step_id: StepId,
    ) -> Result<Completeness, RepositoryError> {
        let mut missing = Vec::new();
        for detail in self.store.dynamic_details(step_id)? {
            if !detail.required {
                continue;
            }
            let filled = self
                .store
                .detail_value(applicant_id, &detail.key)?
                .is_some_and(|value| !value.trim().is_empty());
            if !filled {
                missing.push(detail.key);
            }
        }
        Ok(Completeness::from_missing(missing))
    }
}
