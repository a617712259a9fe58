use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

use super::domain::{DetailKind, Pipeline, Step, StepDynamicDetail, StepRequirement};
use super::error::AdmissionError;
use super::repository::{AdmissionStore, StepDraft};
use crate::ids::{PipelineId, StepId};
use crate::workflows::store::{Guarded, RepositoryError};

/// A pipeline with its steps in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineStepGraph {
    pub pipeline: Pipeline,
    steps: Vec<Step>,
}

impl PipelineStepGraph {
    pub fn new(pipeline: Pipeline, mut steps: Vec<Step>) -> Self {
        steps.retain(|step| step.pipeline_id == pipeline.id);
        steps.sort_by_key(|step| (step.ord, step.id));
        Self { pipeline, steps }
    }

    /// Entry step for new applicants: the lowest ord (intended to be 1).
    pub fn first_step(&self) -> Option<&Step> {
        self.steps.first()
    }

    pub fn step(&self, id: StepId) -> Option<&Step> {
        self.steps.iter().find(|step| step.id == id)
    }

    pub fn contains(&self, id: StepId) -> bool {
        self.step(id).is_some()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Step following `id` in display order.
    pub fn next_after(&self, id: StepId) -> Option<&Step> {
        let index = self.steps.iter().position(|step| step.id == id)?;
        self.steps.get(index + 1)
    }

    pub fn next_ord(&self) -> u32 {
        self.steps.iter().map(|step| step.ord).max().unwrap_or(0) + 1
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPipeline {
    pub name: String,
    pub year: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewStep {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub ord: Option<u32>,
    #[serde(default)]
    pub is_final: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StepUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub ord: Option<u32>,
    #[serde(default)]
    pub is_final: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetailSpec {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: DetailKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Step with its document requirements and custom-field schema.
#[derive(Debug, Clone, Serialize)]
pub struct StepSchema {
    pub step: Step,
    pub requirements: Vec<StepRequirement>,
    pub details: Vec<StepDynamicDetail>,
}

/// Pipeline and step administration.
pub struct PipelineCatalog<S> {
    store: Arc<S>,
}

impl<S> PipelineCatalog<S>
where
    S: AdmissionStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn create_pipeline(&self, request: NewPipeline) -> Result<Pipeline, AdmissionError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AdmissionError::Validation(
                "pipeline name is required".to_string(),
            ));
        }
        if request.year <= 0 {
            return Err(AdmissionError::Validation(format!(
                "pipeline year {} is invalid",
                request.year
            )));
        }

        let pipeline = self.store.insert_pipeline(name.to_string(), request.year)?;
        info!(pipeline_id = %pipeline.id, name = %pipeline.name, "pipeline created");
        Ok(pipeline)
    }

    pub fn pipeline(&self, id: PipelineId) -> Result<PipelineStepGraph, AdmissionError> {
        load_graph(self.store.as_ref(), id)
    }

    pub fn add_step(
        &self,
        pipeline_id: PipelineId,
        request: NewStep,
    ) -> Result<Step, AdmissionError> {
        let graph = self.pipeline(pipeline_id)?;
        let title = request.title.trim().to_string();
        if title.is_empty() {
            return Err(AdmissionError::Validation("step title is required".to_string()));
        }

        let slug = match request.slug.as_deref().map(slugify) {
            Some(slug) if !slug.is_empty() => slug,
            _ => slugify(&title),
        };
        let ord = request.ord.unwrap_or_else(|| graph.next_ord());
        if ord == 0 {
            return Err(AdmissionError::Validation("step ord starts at 1".to_string()));
        }
        check_unique(&graph, None, ord, &slug)?;

        let step = self
            .store
            .insert_step(StepDraft {
                pipeline_id,
                title,
                slug,
                ord,
                is_final: request.is_final,
            })
            .map_err(conflict_as_validation)?;
        info!(pipeline_id = %pipeline_id, step_id = %step.id, ord = step.ord, "step added");
        Ok(step)
    }

    pub fn update_step(&self, step_id: StepId, update: StepUpdate) -> Result<Step, AdmissionError> {
        let mut step = self.load_step(step_id)?;
        let graph = self.pipeline(step.pipeline_id)?;

        if let Some(title) = update.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(AdmissionError::Validation("step title is required".to_string()));
            }
            step.title = title;
        }
        if let Some(slug) = update.slug {
            let slug = slugify(&slug);
            if slug.is_empty() {
                return Err(AdmissionError::Validation("step slug is required".to_string()));
            }
            step.slug = slug;
        }
        if let Some(ord) = update.ord {
            if ord == 0 {
                return Err(AdmissionError::Validation("step ord starts at 1".to_string()));
            }
            step.ord = ord;
        }
        if let Some(is_final) = update.is_final {
            step.is_final = is_final;
        }
        check_unique(&graph, Some(step.id), step.ord, &step.slug)?;

        self.store
            .update_step(step.clone())
            .map_err(conflict_as_validation)?;
        Ok(step)
    }

    /// Delete a step nobody sits on. Remaining ords are left as they are.
    pub fn remove_step(&self, step_id: StepId) -> Result<(), AdmissionError> {
        match self.store.delete_step_if_unoccupied(step_id)? {
            Guarded::Applied(step) => {
                info!(pipeline_id = %step.pipeline_id, step_id = %step_id, "step removed");
                Ok(())
            }
            Guarded::Rejected(occupants) => Err(AdmissionError::Validation(format!(
                "step {step_id} still has {occupants} applicant(s)"
            ))),
            Guarded::Missing => Err(AdmissionError::not_found("step", step_id.0)),
        }
    }

    pub fn set_requirements(
        &self,
        step_id: StepId,
        doc_keys: Vec<String>,
    ) -> Result<Vec<StepRequirement>, AdmissionError> {
        self.load_step(step_id)?;
        let mut seen = HashSet::new();
        let keys: Vec<String> = doc_keys
            .into_iter()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty() && seen.insert(key.clone()))
            .collect();

        self.store.replace_requirements(step_id, keys)?;
        Ok(self.store.requirements(step_id)?)
    }

    pub fn set_dynamic_details(
        &self,
        step_id: StepId,
        specs: Vec<DetailSpec>,
    ) -> Result<Vec<StepDynamicDetail>, AdmissionError> {
        self.load_step(step_id)?;
        let mut seen = HashSet::new();
        let mut details = Vec::with_capacity(specs.len());
        for spec in specs {
            let key = spec.key.trim().to_string();
            if key.is_empty() {
                return Err(AdmissionError::Validation("detail key is required".to_string()));
            }
            if !seen.insert(key.clone()) {
                return Err(AdmissionError::Validation(format!(
                    "detail key '{key}' is declared twice"
                )));
            }
            if spec.kind == DetailKind::Select && spec.options.is_empty() {
                return Err(AdmissionError::Validation(format!(
                    "select detail '{key}' needs options"
                )));
            }
            let label = spec
                .label
                .map(|label| label.trim().to_string())
                .filter(|label| !label.is_empty())
                .unwrap_or_else(|| key.clone());
            details.push(StepDynamicDetail {
                step_id,
                key,
                kind: spec.kind,
                required: spec.required,
                label,
                options: spec.options,
            });
        }

        self.store.replace_dynamic_details(step_id, details)?;
        Ok(self.store.dynamic_details(step_id)?)
    }

    pub fn step_schema(&self, step_id: StepId) -> Result<StepSchema, AdmissionError> {
        let step = self.load_step(step_id)?;
        Ok(StepSchema {
            requirements: self.store.requirements(step_id)?,
            details: self.store.dynamic_details(step_id)?,
            step,
        })
    }

    fn load_step(&self, step_id: StepId) -> Result<Step, AdmissionError> {
        self.store
            .step(step_id)?
            .ok_or_else(|| AdmissionError::not_found("step", step_id.0))
    }
}

pub(crate) fn load_graph<S>(store: &S, id: PipelineId) -> Result<PipelineStepGraph, AdmissionError>
where
    S: AdmissionStore + ?Sized,
{
    let pipeline = store
        .pipeline(id)?
        .ok_or_else(|| AdmissionError::not_found("pipeline", id.0))?;
    let steps = store.steps(id)?;
    Ok(PipelineStepGraph::new(pipeline, steps))
}

fn check_unique(
    graph: &PipelineStepGraph,
    except: Option<StepId>,
    ord: u32,
    slug: &str,
) -> Result<(), AdmissionError> {
    for step in graph.steps().iter().filter(|step| Some(step.id) != except) {
        if step.ord == ord {
            return Err(AdmissionError::Validation(format!(
                "ord {ord} is already used by step '{}'",
                step.slug
            )));
        }
        if step.slug == slug {
            return Err(AdmissionError::Validation(format!(
                "slug '{slug}' is already used in this pipeline"
            )));
        }
    }
    Ok(())
}

fn conflict_as_validation(err: RepositoryError) -> AdmissionError {
    match err {
        RepositoryError::Conflict(detail) => AdmissionError::Validation(detail),
        other => other.into(),
    }
}

/// Lowercase ASCII slug with single dashes between words.
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    for ch in raw.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: u64, ord: u32) -> Step {
        Step {
            id: StepId(id),
            pipeline_id: PipelineId(1),
            title: format!("Step {id}"),
            slug: format!("step-{id}"),
            ord,
            is_final: false,
        }
    }

    fn graph() -> PipelineStepGraph {
        let pipeline = Pipeline {
            id: PipelineId(1),
            name: "Undergraduate".to_string(),
            year: 2025,
        };
        let mut foreign = step(9, 1);
        foreign.pipeline_id = PipelineId(2);
        PipelineStepGraph::new(pipeline, vec![step(3, 3), step(1, 1), foreign, step(2, 2)])
    }

    #[test]
    fn graph_orders_steps_and_drops_foreign_ones() {
        let graph = graph();
        let ords: Vec<u32> = graph.steps().iter().map(|step| step.ord).collect();
        assert_eq!(ords, vec![1, 2, 3]);
        assert_eq!(graph.first_step().map(|step| step.id), Some(StepId(1)));
        assert!(!graph.contains(StepId(9)));
        assert_eq!(graph.next_after(StepId(2)).map(|s| s.id), Some(StepId(3)));
        assert!(graph.next_after(StepId(3)).is_none());
        assert_eq!(graph.next_ord(), 4);
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Document Review / Final "), "document-review-final");
        assert_eq!(slugify("Interview #2"), "interview-2");
        assert_eq!(slugify("***"), "");
    }
}
