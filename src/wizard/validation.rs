//! Validation rules for the training-request wizard.
//!
//! Each step owns an ordered list of rules. Step validation reports every
//! failing field of one step; submission walks the steps in display order and
//! stops at the first failing rule.

use serde_json::Value;

use super::types::{FieldError, FieldMap, SubmitRejection, TrainingStep};

pub const MAX_ORGANISATION_NAME_LEN: usize = 64;
pub const MAX_ROUNDS: u64 = 1000;

type Rule = fn(&FieldMap) -> Option<FieldError>;

fn non_empty_str<'a>(fields: &'a FieldMap, name: &str) -> Option<&'a str> {
    fields
        .get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn organisation_name(fields: &FieldMap) -> Option<FieldError> {
    let Some(name) = non_empty_str(fields, "organisation_name") else {
        return Some(FieldError::new(
            "organisation_name",
            "Organisation name is required",
        ));
    };
    if name.chars().count() > MAX_ORGANISATION_NAME_LEN {
        return Some(FieldError::new(
            "organisation_name",
            format!(
                "Organisation name must be at most {} characters",
                MAX_ORGANISATION_NAME_LEN
            ),
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Some(FieldError::new(
            "organisation_name",
            "Organisation name may only contain letters, digits, '_' and '-'",
        ));
    }
    None
}

fn dataset_selected(fields: &FieldMap) -> Option<FieldError> {
    if non_empty_str(fields, "dataset_id").is_some()
        || non_empty_str(fields, "train_filename").is_some()
    {
        None
    } else {
        Some(FieldError::new("dataset_id", "Select a training dataset"))
    }
}

fn task_selected(fields: &FieldMap) -> Option<FieldError> {
    let present = match fields.get("task_id") {
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Number(_)) => true,
        _ => false,
    };
    if present {
        None
    } else {
        Some(FieldError::new("task_id", "Select a task for the dataset"))
    }
}

fn output_columns(fields: &FieldMap) -> Option<FieldError> {
    let columns = fields.get("output_columns").and_then(Value::as_array);
    match columns {
        Some(cols) if !cols.is_empty() => {
            let all_named = cols
                .iter()
                .all(|c| c.as_str().is_some_and(|s| !s.trim().is_empty()));
            if all_named {
                None
            } else {
                Some(FieldError::new(
                    "output_columns",
                    "Output columns must be column names",
                ))
            }
        }
        _ => Some(FieldError::new(
            "output_columns",
            "Select at least one output column",
        )),
    }
}

fn model_selected(fields: &FieldMap) -> Option<FieldError> {
    if non_empty_str(fields, "model_name").is_none() {
        return Some(FieldError::new("model_name", "Select a model"));
    }
    match fields.get("model_config") {
        None | Some(Value::Null) | Some(Value::Object(_)) => None,
        Some(_) => Some(FieldError::new(
            "model_config",
            "Model configuration must be an object",
        )),
    }
}

fn statistical_metrics(fields: &FieldMap) -> Option<FieldError> {
    match fields.get("statistical_metrics").and_then(Value::as_array) {
        Some(metrics) if !metrics.is_empty() => None,
        _ => Some(FieldError::new(
            "statistical_metrics",
            "Select at least one statistical metric",
        )),
    }
}

fn num_clients(fields: &FieldMap) -> Option<FieldError> {
    match fields.get("num_clients").and_then(Value::as_u64) {
        Some(n) if n >= 1 => None,
        _ => Some(FieldError::new(
            "num_clients",
            "Number of clients must be a whole number of at least 1",
        )),
    }
}

fn num_rounds(fields: &FieldMap) -> Option<FieldError> {
    match fields.get("num_rounds").and_then(Value::as_u64) {
        Some(n) if (1..=MAX_ROUNDS).contains(&n) => None,
        _ => Some(FieldError::new(
            "num_rounds",
            format!("Number of rounds must be between 1 and {}", MAX_ROUNDS),
        )),
    }
}

fn learning_rate(fields: &FieldMap) -> Option<FieldError> {
    match fields.get("learning_rate").and_then(Value::as_f64) {
        Some(lr) if lr > 0.0 && lr <= 1.0 => None,
        _ => Some(FieldError::new(
            "learning_rate",
            "Learning rate must be greater than 0 and at most 1",
        )),
    }
}

fn batch_size(fields: &FieldMap) -> Option<FieldError> {
    match fields.get("batch_size").and_then(Value::as_u64) {
        Some(n) if n >= 1 => None,
        _ => Some(FieldError::new(
            "batch_size",
            "Batch size must be a whole number of at least 1",
        )),
    }
}

const ORGANISATION_RULES: &[Rule] = &[organisation_name];
// Dataset selection is checked before output-column selection
const DATASET_RULES: &[Rule] = &[dataset_selected, task_selected, output_columns];
const MODEL_RULES: &[Rule] = &[model_selected];
const STATISTICS_RULES: &[Rule] = &[statistical_metrics, num_clients];
const HYPERPARAMETER_RULES: &[Rule] = &[num_rounds, learning_rate, batch_size];

/// Rules for a step, in the order they are checked
fn rules_for(step: TrainingStep) -> &'static [Rule] {
    match step {
        TrainingStep::Organisation => ORGANISATION_RULES,
        TrainingStep::Dataset => DATASET_RULES,
        TrainingStep::Model => MODEL_RULES,
        TrainingStep::Statistics => STATISTICS_RULES,
        TrainingStep::Hyperparameters => HYPERPARAMETER_RULES,
        TrainingStep::Review => &[],
    }
}

/// Validate the fields of one step.
pub fn validate_step(step: TrainingStep, fields: &FieldMap) -> Result<(), Vec<FieldError>> {
    let errors: Vec<FieldError> = rules_for(step)
        .iter()
        .filter_map(|rule| rule(fields))
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the whole form, reporting only the first failure.
pub fn validate_submission(fields: &FieldMap) -> Result<(), SubmitRejection> {
    for &step in TrainingStep::all() {
        if let Some(error) = rules_for(step).iter().find_map(|rule| rule(fields)) {
            return Err(SubmitRejection {
                step,
                message: error.message,
            });
        }
    }
    Ok(())
}
