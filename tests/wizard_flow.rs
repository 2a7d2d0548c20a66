//! End-to-end tests for the training-request wizard backed by a state file.
//!
//! Each test opens wizards the way the CLI does: a fresh `FormWizard` over a
//! `FileStorage` per command, so resume behavior is exercised across instances.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use feddash::api::{ApiError, CreateSessionResponse, SessionCreator};
use feddash::wizard::{
    FieldMap, FileStorage, FormWizard, PersistedFormStore, TrainingStep, WizardError, WizardPhase,
};

const PREFIX: &str = "training_request";

#[derive(Default)]
struct RecordingSessions {
    calls: AtomicUsize,
    fail_with: Option<u16>,
}

#[async_trait]
impl SessionCreator for RecordingSessions {
    async fn create_session(&self, fields: &FieldMap) -> Result<CreateSessionResponse, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.fail_with {
            return Err(ApiError::from_status("sessions", status, "session", "", None));
        }
        let org = fields
            .get("organisation_name")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        Ok(CreateSessionResponse {
            session_id: format!("{}-session", org),
            status: None,
        })
    }
}

fn open(
    dir: &TempDir,
    sessions: &Arc<RecordingSessions>,
) -> FormWizard<FileStorage, Arc<RecordingSessions>> {
    let storage = FileStorage::new(dir.path().join("state").join("wizard.json"));
    FormWizard::new(PersistedFormStore::new(storage, PREFIX), Arc::clone(sessions))
}

fn object(value: Value) -> FieldMap {
    value.as_object().cloned().unwrap()
}

fn step_fields(step: TrainingStep) -> FieldMap {
    match step {
        TrainingStep::Organisation => object(json!({"organisation_name": "north-clinic"})),
        TrainingStep::Dataset => object(json!({
            "dataset_id": "ds-7",
            "task_id": 3,
            "output_columns": ["outcome"]
        })),
        TrainingStep::Model => object(json!({
            "model_name": "logreg",
            "model_config": {"penalty": "l2"}
        })),
        TrainingStep::Statistics => object(json!({
            "statistical_metrics": ["mean", "std"],
            "num_clients": 4
        })),
        TrainingStep::Hyperparameters => object(json!({
            "num_rounds": 20,
            "learning_rate": 0.01,
            "batch_size": 32
        })),
        TrainingStep::Review => FieldMap::new(),
    }
}

#[test]
fn test_progress_survives_reopening() {
    let dir = TempDir::new().unwrap();
    let sessions = Arc::new(RecordingSessions::default());

    {
        let mut wizard = open(&dir, &sessions);
        for (name, value) in step_fields(TrainingStep::Organisation) {
            wizard.set_field(&name, value).unwrap();
        }
        assert_eq!(wizard.go_next().unwrap(), 1);
    }

    let wizard = open(&dir, &sessions);
    assert_eq!(wizard.current_step(), 1);
    assert_eq!(
        wizard.fields().get("organisation_name"),
        Some(&json!("north-clinic"))
    );
}

#[test]
fn test_fresh_directory_starts_at_first_step() {
    let dir = TempDir::new().unwrap();
    let sessions = Arc::new(RecordingSessions::default());

    let wizard = open(&dir, &sessions);
    assert_eq!(wizard.current_step(), 0);
    assert!(wizard.fields().is_empty());
    assert_eq!(wizard.phase(), WizardPhase::Editing);
}

#[test]
fn test_invalid_step_blocks_navigation_and_reports_fields() {
    let dir = TempDir::new().unwrap();
    let sessions = Arc::new(RecordingSessions::default());
    let mut wizard = open(&dir, &sessions);

    wizard
        .set_field("organisation_name", json!("has spaces"))
        .unwrap();
    match wizard.go_next() {
        Err(WizardError::InvalidStep { step, errors }) => {
            assert_eq!(step, 0);
            assert!(errors.iter().any(|e| e.field == "organisation_name"));
        }
        other => panic!("expected InvalidStep, got {:?}", other),
    }
    assert_eq!(open(&dir, &sessions).current_step(), 0);
}

#[tokio::test]
async fn test_full_walkthrough_submits_and_clears_state_file() {
    let dir = TempDir::new().unwrap();
    let sessions = Arc::new(RecordingSessions::default());

    // One wizard instance per step, as the CLI would do
    for step in TrainingStep::all() {
        let mut wizard = open(&dir, &sessions);
        assert_eq!(wizard.current_step(), step.index());
        for (name, value) in step_fields(*step) {
            wizard.set_field(&name, value).unwrap();
        }
        if *step != TrainingStep::Review {
            wizard.go_next().unwrap();
        }
    }

    let mut wizard = open(&dir, &sessions);
    let response = wizard.submit().await.unwrap();
    assert_eq!(response.session_id, "north-clinic-session");
    assert_eq!(sessions.calls.load(Ordering::SeqCst), 1);
    assert_eq!(wizard.phase(), WizardPhase::Submitted);

    let reopened = open(&dir, &sessions);
    assert!(reopened.fields().is_empty());
    assert_eq!(reopened.current_step(), 0);
}

#[tokio::test]
async fn test_submit_with_missing_dataset_jumps_back() {
    let dir = TempDir::new().unwrap();
    let sessions = Arc::new(RecordingSessions::default());
    let mut wizard = open(&dir, &sessions);

    let mut fields = FieldMap::new();
    for step in TrainingStep::all() {
        if *step != TrainingStep::Dataset {
            fields.extend(step_fields(*step));
        }
    }
    wizard.init_from_prefill(fields, Vec::<usize>::new()).unwrap();

    match wizard.submit().await {
        Err(WizardError::Rejected(rejection)) => {
            assert_eq!(rejection.step, TrainingStep::Dataset);
        }
        other => panic!("expected rejection, got {:?}", other),
    }
    assert_eq!(wizard.current_step(), TrainingStep::Dataset.index());
    assert_eq!(sessions.calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        open(&dir, &sessions).current_step(),
        TrainingStep::Dataset.index()
    );
}

#[tokio::test]
async fn test_backend_failure_keeps_saved_request() {
    let dir = TempDir::new().unwrap();
    let sessions = Arc::new(RecordingSessions {
        fail_with: Some(503),
        ..Default::default()
    });
    let mut wizard = open(&dir, &sessions);

    let mut fields = FieldMap::new();
    for step in TrainingStep::all() {
        fields.extend(step_fields(*step));
    }
    wizard.init_from_prefill(fields, Vec::<usize>::new()).unwrap();

    let err = wizard.submit().await.unwrap_err();
    assert!(matches!(err, WizardError::Collaborator(ref e) if e.is_transient()));
    assert_eq!(wizard.phase(), WizardPhase::Editing);

    let reopened = open(&dir, &sessions);
    assert_eq!(
        reopened.fields().get("dataset_id"),
        Some(&json!("ds-7"))
    );
}

#[test]
fn test_retry_prefill_skips_locked_steps() {
    let dir = TempDir::new().unwrap();
    let sessions = Arc::new(RecordingSessions::default());
    let mut wizard = open(&dir, &sessions);

    let mut fields = FieldMap::new();
    for step in TrainingStep::all() {
        fields.extend(step_fields(*step));
    }
    let locked = [TrainingStep::Dataset.index(), TrainingStep::Model.index()];
    wizard.init_from_prefill(fields, locked).unwrap();

    assert_eq!(wizard.current_step(), 0);
    assert_eq!(wizard.go_next().unwrap(), TrainingStep::Statistics.index());
    assert_eq!(wizard.go_prev().unwrap(), TrainingStep::Organisation.index());
}

#[test]
fn test_discard_removes_saved_request() {
    let dir = TempDir::new().unwrap();
    let sessions = Arc::new(RecordingSessions::default());

    let mut wizard = open(&dir, &sessions);
    wizard
        .set_field("organisation_name", json!("north-clinic"))
        .unwrap();
    wizard.go_next().unwrap();
    wizard.discard().unwrap();

    let reopened = open(&dir, &sessions);
    assert!(reopened.fields().is_empty());
    assert_eq!(reopened.current_step(), 0);
}

#[test]
fn test_corrupt_state_file_starts_clean() {
    let dir = TempDir::new().unwrap();
    let sessions = Arc::new(RecordingSessions::default());
    let path = dir.path().join("state").join("wizard.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "{ not json").unwrap();

    let mut wizard = open(&dir, &sessions);
    assert!(wizard.fields().is_empty());

    wizard
        .set_field("organisation_name", json!("north-clinic"))
        .unwrap();
    let reopened = open(&dir, &sessions);
    assert_eq!(
        reopened.fields().get("organisation_name"),
        Some(&json!("north-clinic"))
    );
}
