//! Client-side form validation run before an edit form is submitted.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use store::models::form_schema::{DataPanel, FormData, FormSchema, ValidatorRule};

use super::edit_page::EditMode;

/// Validation messages keyed by `form_field_name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[async_trait]
pub trait FormValidator: Send + Sync {
    /// `Ok(())` when `formdata` may be submitted from a page in `mode`.
    async fn validate(
        &self,
        mode: EditMode,
        schema: Option<&FormSchema>,
        formdata: &FormData,
    ) -> Result<(), FormErrors>;
}

/// Enforces each data panel's `required` flag and its `required`/`min`/`max` rules.
///
/// `min`/`max` bound the length of strings and lists and the value of numbers. Empty values
/// are only checked for presence. Panels hidden or disabled in the page's mode are not rendered,
/// so they are not validated either.
#[derive(Debug, Clone, Default)]
pub struct SchemaValidator;

#[async_trait]
impl FormValidator for SchemaValidator {
    async fn validate(
        &self,
        mode: EditMode,
        schema: Option<&FormSchema>,
        formdata: &FormData,
    ) -> Result<(), FormErrors> {
        let Some(schema) = schema else {
            return Ok(());
        };

        let mut errors = FormErrors::new();
        for panel in schema.data_panels() {
            if !is_editable(panel, mode) {
                continue;
            }
            check_panel(panel, formdata.get(&panel.form_field_name), &mut errors);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

fn is_editable(panel: &DataPanel, mode: EditMode) -> bool {
    let (hidden, disabled) = match mode {
        EditMode::New => (panel.hide_on_new, panel.disabled_on_new),
        EditMode::Edit => (panel.hide_on_edit, panel.disabled_on_edit),
    };
    !(panel.disabled || hidden || disabled)
}

fn check_panel(panel: &DataPanel, value: Option<&Value>, errors: &mut FormErrors) {
    let empty = value.is_none_or(is_empty);

    if panel.required && empty {
        errors.add(&panel.form_field_name, format!("{} is required", panel.label()));
        return;
    }

    for rule in &panel.validators {
        if rule.required && empty {
            errors.add(&panel.form_field_name, rule_message(rule, panel, "is required"));
            return;
        }
        let Some(measure) = value.and_then(measure) else {
            continue;
        };
        if let Some(min) = rule.min {
            if measure < min as f64 {
                errors.add(
                    &panel.form_field_name,
                    rule_message(rule, panel, &format!("must be at least {min}")),
                );
            }
        }
        if let Some(max) = rule.max {
            if measure > max as f64 {
                errors.add(
                    &panel.form_field_name,
                    rule_message(rule, panel, &format!("must be at most {max}")),
                );
            }
        }
    }
}

fn rule_message(rule: &ValidatorRule, panel: &DataPanel, fallback: &str) -> String {
    rule.message
        .clone()
        .unwrap_or_else(|| format!("{} {fallback}", panel.label()))
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn measure(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.chars().count() as f64),
        Value::Array(items) if !items.is_empty() => Some(items.len() as f64),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}
