//! Client-side payload validation.
//!
//! Reproduces the remote validator's decision procedure field by field, so
//! a payload rejected here would also be rejected server-side and the
//! network is never used to discover a client-detectable error. A full pass
//! over all declared params always completes before failure is raised; the
//! report carries every problem, not just the first.

use serde_json::Value;

use crate::{
    errors::{Error, Result, ValidationReport},
    files::FileSet,
    types::{InputMode, ParamType, Params, WorkflowDefinition},
};

/// Check a JSON value against a declared param type.
///
/// Only JSON-family types are checked; form-family types carry no JSON
/// shape and pass untouched. No coercion: a numeric string is not a number
/// and a truthy string is not a boolean.
pub fn check_json_value(param_type: ParamType, value: &Value) -> Option<&'static str> {
    match param_type {
        ParamType::JsonString => (!value.is_string()).then_some("Must be a string"),
        ParamType::JsonNumber => (!value.is_number()).then_some("Must be a number"),
        ParamType::JsonBoolean => (!value.is_boolean()).then_some("Must be a boolean"),
        ParamType::JsonObject => (!value.is_object()).then_some("Must be an object"),
        ParamType::JsonArray => (!value.is_array()).then_some("Must be an array"),
        ParamType::FormDataText | ParamType::FormDataFile => None,
    }
}

/// Validate a payload against a workflow definition, dispatching on the
/// workflow's input mode.
///
/// Fails with [`Error::Validation`] carrying the complete report when any
/// field does not conform; reads the payload and files only, never the
/// network. Note that a param whose type family disagrees with the
/// workflow's input mode is silently skipped rather than rejected, matching
/// the remote validator.
pub fn validate(definition: &WorkflowDefinition, params: &Params, files: &FileSet) -> Result<()> {
    let report = match definition.input_mode {
        InputMode::Json => validate_json_mode(definition, params),
        InputMode::FormData => validate_form_data_mode(definition, params, files),
    };

    if report.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(report))
    }
}

fn validate_json_mode(definition: &WorkflowDefinition, params: &Params) -> ValidationReport {
    let mut report = ValidationReport::new();

    for param in &definition.params {
        match params.get(&param.key) {
            None if param.required => report.add(&param.key, "Field is required"),
            None => {}
            Some(value) => {
                if let Some(message) = check_json_value(param.param_type, value) {
                    report.add(&param.key, message);
                }
            }
        }
    }

    // JSON mode is a closed schema: every key outside the declared set is
    // rejected, in payload order.
    for key in params.keys() {
        if !definition.params.iter().any(|p| p.key == *key) {
            report.add(key, "Unknown parameter");
        }
    }

    report
}

fn validate_form_data_mode(
    definition: &WorkflowDefinition,
    params: &Params,
    files: &FileSet,
) -> ValidationReport {
    let mut report = ValidationReport::new();

    for param in &definition.params {
        if param.param_type == ParamType::FormDataFile {
            match files.get(&param.key).filter(|f| !f.is_empty()) {
                None if param.required => report.add(&param.key, "File is required"),
                None => {}
                Some(file) => {
                    if !file.is_readable() {
                        report.add(
                            &param.key,
                            format!("File is not readable: {}", file.display_path()),
                        );
                    }
                }
            }
        } else {
            let missing = match params.get(&param.key) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.is_empty(),
                Some(_) => false,
            };
            if param.required && missing {
                report.add(&param.key, "Field is required");
            }
        }
    }

    // Unlike JSON mode there is no unknown-field rejection: multipart
    // submissions routinely carry incidental extra fields.
    report
}
