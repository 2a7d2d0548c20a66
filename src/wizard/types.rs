//! Type definitions for the training-request wizard

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Field name → value. Values are arbitrary JSON (model configs nest).
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// One step of a wizard, fixed at construction time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Stable ordinal
    pub id: usize,
    /// Display name
    pub label: String,
}

impl StepDefinition {
    pub fn new(id: usize, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }
}

/// Steps in the training-request flow, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrainingStep {
    /// Organisation (session) name
    Organisation,
    /// Dataset, task and output-column selection
    Dataset,
    /// Model choice and model configuration
    Model,
    /// Statistical parameters for federated evaluation
    Statistics,
    /// Training hyperparameters
    Hyperparameters,
    /// Final review before submission
    Review,
}

impl TrainingStep {
    pub fn all() -> &'static [TrainingStep] {
        &[
            TrainingStep::Organisation,
            TrainingStep::Dataset,
            TrainingStep::Model,
            TrainingStep::Statistics,
            TrainingStep::Hyperparameters,
            TrainingStep::Review,
        ]
    }

    pub fn index(self) -> usize {
        match self {
            TrainingStep::Organisation => 0,
            TrainingStep::Dataset => 1,
            TrainingStep::Model => 2,
            TrainingStep::Statistics => 3,
            TrainingStep::Hyperparameters => 4,
            TrainingStep::Review => 5,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::all().get(index).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            TrainingStep::Organisation => "Organisation",
            TrainingStep::Dataset => "Dataset",
            TrainingStep::Model => "Model",
            TrainingStep::Statistics => "Statistical parameters",
            TrainingStep::Hyperparameters => "Hyperparameters",
            TrainingStep::Review => "Review",
        }
    }

    /// Step definitions for the training-request wizard
    pub fn definitions() -> Vec<StepDefinition> {
        Self::all()
            .iter()
            .map(|s| StepDefinition::new(s.index(), s.label()))
            .collect()
    }
}

/// Lifecycle phase of a wizard instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WizardPhase {
    /// User is editing; the step lives in `WizardState::current_step`
    #[default]
    Editing,
    /// Session creation is in flight
    Submitting,
    /// Session created; store cleared, no further navigation
    Submitted,
}

/// What the persisted store hands back on load
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WizardSnapshot {
    pub fields: FieldMap,
    pub step: Option<usize>,
}

/// In-memory state owned by the wizard controller
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WizardState {
    pub fields: FieldMap,
    pub current_step: usize,
    pub locked_steps: BTreeSet<usize>,
    pub phase: WizardPhase,
}

/// A field-level validation failure shown inline next to the input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Full-form validation stopped at this step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRejection {
    pub step: TrainingStep,
    pub message: String,
}

impl std::fmt::Display for SubmitRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} step: {}", self.step.label(), self.message)
    }
}
