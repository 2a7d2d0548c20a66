//! Form wizard controller: validation-gated navigation over persisted state.

use std::collections::{BTreeSet, HashMap};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::sequencer::{next_step, prev_step};
use super::store::{KeyValueStore, PersistedFormStore};
use super::types::{
    FieldError, FieldMap, StepDefinition, SubmitRejection, TrainingStep, WizardPhase, WizardState,
};
use super::validation::{validate_step, validate_submission};
use crate::api::{ApiError, CreateSessionResponse, DatasetStats, SessionCreator, TaskInfo};
use crate::matching::{matching_tasks, selectable_output_columns};

/// Why a wizard operation did not take effect
#[derive(Error, Debug)]
pub enum WizardError {
    #[error("step {step} has {} invalid field(s)", .errors.len())]
    InvalidStep { step: usize, errors: Vec<FieldError> },

    #[error("{0}")]
    Rejected(SubmitRejection),

    #[error("session creation failed: {0}")]
    Collaborator(ApiError),

    #[error("this training request was already submitted")]
    AlreadySubmitted,
}

impl WizardError {
    /// Text for an inline message or transient notification
    pub fn user_message(&self) -> String {
        match self {
            WizardError::InvalidStep { errors, .. } => errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            WizardError::Rejected(rejection) => rejection.to_string(),
            WizardError::Collaborator(err) => err.user_message(),
            WizardError::AlreadySubmitted => self.to_string(),
        }
    }
}

/// Identifies one outstanding fetch so its response can be matched to the
/// step and request it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    key: String,
    step: usize,
    generation: u64,
}

impl FetchTicket {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn step(&self) -> usize {
        self.step
    }
}

/// Options loaded from the catalog for the dataset step. Not persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetOptions {
    pub columns: Vec<String>,
    pub output_candidates: Vec<String>,
    pub tasks: Vec<TaskInfo>,
}

/// Drives a resumable multi-step form.
///
/// Owns the only copy of [`WizardState`]; the persisted store mirrors the
/// fields and step index so a new instance resumes where the last one left off.
pub struct FormWizard<S: KeyValueStore, C: SessionCreator> {
    steps: Vec<StepDefinition>,
    store: PersistedFormStore<S>,
    sessions: C,
    state: WizardState,
    options: DatasetOptions,
    fetch_generations: HashMap<String, u64>,
    next_generation: u64,
}

impl<S: KeyValueStore, C: SessionCreator> FormWizard<S, C> {
    /// Open the training-request wizard
    pub fn new(store: PersistedFormStore<S>, sessions: C) -> Self {
        Self::with_steps(TrainingStep::definitions(), store, sessions)
    }

    /// Open a wizard over custom steps, resuming any saved state
    pub fn with_steps(
        steps: Vec<StepDefinition>,
        store: PersistedFormStore<S>,
        sessions: C,
    ) -> Self {
        let mut state = WizardState::default();
        if let Some(snapshot) = store.load() {
            state.fields = snapshot.fields;
            if let Some(step) = snapshot.step {
                state.current_step = step.min(steps.len().saturating_sub(1));
            }
            debug!(
                step = state.current_step,
                fields = state.fields.len(),
                "Resumed saved wizard"
            );
        }

        Self {
            steps,
            store,
            sessions,
            state,
            options: DatasetOptions::default(),
            fetch_generations: HashMap::new(),
            next_generation: 0,
        }
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn fields(&self) -> &FieldMap {
        &self.state.fields
    }

    pub fn current_step(&self) -> usize {
        self.state.current_step
    }

    pub fn current_step_definition(&self) -> Option<&StepDefinition> {
        self.steps.get(self.state.current_step)
    }

    pub fn phase(&self) -> WizardPhase {
        self.state.phase
    }

    pub fn is_locked(&self, step: usize) -> bool {
        self.state.locked_steps.contains(&step)
    }

    pub fn dataset_options(&self) -> &DatasetOptions {
        &self.options
    }

    pub fn store(&self) -> &PersistedFormStore<S> {
        &self.store
    }

    fn ensure_editable(&self) -> Result<(), WizardError> {
        match self.state.phase {
            WizardPhase::Submitted => Err(WizardError::AlreadySubmitted),
            WizardPhase::Editing | WizardPhase::Submitting => Ok(()),
        }
    }

    fn move_to(&mut self, step: usize) {
        if step != self.state.current_step {
            debug!(from = self.state.current_step, to = step, "Wizard step changed");
            // Leaving a step orphans every fetch issued on it
            self.fetch_generations.clear();
        }
        self.state.current_step = step;
        self.store.save_step(step);
    }

    /// Set one field and persist the form
    pub fn set_field(&mut self, name: &str, value: Value) -> Result<(), WizardError> {
        self.ensure_editable()?;
        self.state.fields.insert(name.to_string(), value);
        self.store.save(&self.state.fields);
        Ok(())
    }

    pub fn remove_field(&mut self, name: &str) -> Result<Option<Value>, WizardError> {
        self.ensure_editable()?;
        let removed = self.state.fields.remove(name);
        self.store.save(&self.state.fields);
        Ok(removed)
    }

    /// Validate the current step and advance past any locked steps.
    ///
    /// On invalid input nothing changes and the field errors come back in
    /// the error.
    pub fn go_next(&mut self) -> Result<usize, WizardError> {
        self.ensure_editable()?;
        let current = self.state.current_step;

        if let Some(step) = TrainingStep::from_index(current) {
            if let Err(errors) = validate_step(step, &self.state.fields) {
                debug!(step = current, count = errors.len(), "Step validation failed");
                return Err(WizardError::InvalidStep {
                    step: current,
                    errors,
                });
            }
        }

        let next = next_step(current, &self.state.locked_steps, self.steps.len());
        self.move_to(next);
        Ok(next)
    }

    /// Step back past any locked steps. No validation.
    pub fn go_prev(&mut self) -> Result<usize, WizardError> {
        self.ensure_editable()?;
        let prev = prev_step(self.state.current_step, &self.state.locked_steps);
        self.move_to(prev);
        Ok(prev)
    }

    /// Replace the form with prefilled values (the "retry" entry path).
    ///
    /// The prefill becomes the new persisted baseline and the wizard restarts
    /// at step 0, even when step 0 is locked.
    pub fn init_from_prefill(
        &mut self,
        prefill: FieldMap,
        locked_steps: impl IntoIterator<Item = usize>,
    ) -> Result<(), WizardError> {
        self.ensure_editable()?;
        let step_count = self.steps.len();
        let locked: BTreeSet<usize> = locked_steps
            .into_iter()
            .filter(|&i| i < step_count)
            .collect();

        info!(
            fields = prefill.len(),
            locked = ?locked,
            "Initializing wizard from prefill"
        );

        self.state.fields = prefill;
        self.state.locked_steps = locked;
        self.state.current_step = 0;
        self.options = DatasetOptions::default();
        self.fetch_generations.clear();
        self.store.replace(&self.state.fields);
        self.store.save_step(0);
        Ok(())
    }

    /// Replace the set of locked steps without touching the form.
    ///
    /// Locks are not persisted, so a caller that reopens the wizard supplies
    /// them again here.
    pub fn lock_steps(&mut self, steps: impl IntoIterator<Item = usize>) {
        let step_count = self.steps.len();
        self.state.locked_steps = steps.into_iter().filter(|&i| i < step_count).collect();
    }

    /// Throw away all entered data and saved state
    pub fn discard(&mut self) -> Result<(), WizardError> {
        self.ensure_editable()?;
        self.store.clear();
        self.state = WizardState::default();
        self.options = DatasetOptions::default();
        self.fetch_generations.clear();
        Ok(())
    }

    /// Validate the whole form and create the training session.
    ///
    /// A validation failure jumps to the failing step without calling the
    /// backend. A backend failure leaves fields and saved state untouched.
    pub async fn submit(&mut self) -> Result<CreateSessionResponse, WizardError> {
        self.ensure_editable()?;

        if let Err(rejection) = validate_submission(&self.state.fields) {
            let target = rejection
                .step
                .index()
                .min(self.steps.len().saturating_sub(1));
            warn!(step = target, reason = %rejection.message, "Submission rejected");
            self.move_to(target);
            return Err(WizardError::Rejected(rejection));
        }

        self.state.phase = WizardPhase::Submitting;
        match self.sessions.create_session(&self.state.fields).await {
            Ok(response) => {
                info!(session_id = %response.session_id, "Training session created");
                self.store.clear();
                self.state.phase = WizardPhase::Submitted;
                Ok(response)
            }
            Err(err) => {
                warn!(error = %err, "Session creation failed");
                self.state.phase = WizardPhase::Editing;
                Err(WizardError::Collaborator(err))
            }
        }
    }

    // ─── Stale-response guard ───────────────────────────────────────────────

    /// Tag a fetch about to be issued. Issuing a new ticket for the same key
    /// supersedes the previous one.
    pub fn begin_fetch(&mut self, key: &str) -> FetchTicket {
        self.next_generation += 1;
        self.fetch_generations
            .insert(key.to_string(), self.next_generation);
        FetchTicket {
            key: key.to_string(),
            step: self.state.current_step,
            generation: self.next_generation,
        }
    }

    /// Whether a response for `ticket` may still be applied.
    ///
    /// Tickets die when superseded for their key, when the wizard leaves
    /// their step, and when the form is replaced or discarded.
    pub fn accepts(&self, ticket: &FetchTicket) -> bool {
        self.state.phase == WizardPhase::Editing
            && self.state.current_step == ticket.step
            && self.fetch_generations.get(&ticket.key) == Some(&ticket.generation)
    }

    /// Apply dataset stats fetched under `ticket`. Returns false (and changes
    /// nothing) for a stale response.
    pub fn apply_dataset_stats(&mut self, ticket: &FetchTicket, stats: &DatasetStats) -> bool {
        if !self.accepts(ticket) {
            debug!(key = %ticket.key, step = ticket.step, "Discarding stale dataset stats");
            return false;
        }

        self.options.columns = stats.columns.clone();
        self.options.output_candidates = selectable_output_columns(stats);

        // Keep only selections that still exist in the new layout
        let candidates = &self.options.output_candidates;
        if let Some(Value::Array(selected)) = self.state.fields.get_mut("output_columns") {
            let before = selected.len();
            selected.retain(|c| c.as_str().is_some_and(|s| candidates.iter().any(|k| k == s)));
            if selected.len() != before {
                self.store.save(&self.state.fields);
            }
        }
        true
    }

    /// Apply a task listing fetched under `ticket`, keeping only tasks the
    /// loaded columns can serve.
    pub fn apply_tasks(&mut self, ticket: &FetchTicket, tasks: &[TaskInfo]) -> bool {
        if !self.accepts(ticket) {
            debug!(key = %ticket.key, step = ticket.step, "Discarding stale task list");
            return false;
        }

        self.options.tasks = if self.options.columns.is_empty() {
            tasks.to_vec()
        } else {
            matching_tasks(&self.options.columns, tasks)
                .into_iter()
                .cloned()
                .collect()
        };
        true
    }
}
