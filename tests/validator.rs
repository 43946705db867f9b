//! Validator behavior over the public API: the client-side rules must agree
//! with the remote validator field by field.

use std::io::Write;

use serde_json::{json, Value};
use sharpapi_workflows::{validate, Error, FileSet, Params, WorkflowDefinition};

fn definition(descriptor: Value) -> WorkflowDefinition {
    WorkflowDefinition::from_descriptor(&descriptor).expect("descriptor is valid")
}

fn params_from(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

fn report_of(err: Error) -> sharpapi_workflows::ValidationReport {
    match err {
        Error::Validation(report) => report,
        other => panic!("expected validation error, got {other:?}"),
    }
}

fn summarize() -> WorkflowDefinition {
    definition(json!({
        "slug": "summarize",
        "name": "Summarize",
        "input_mode": "application/json",
        "params": [
            {"key": "text", "type": "json_string", "required": true},
            {"key": "max_words", "type": "json_number"},
        ],
    }))
}

#[test]
fn missing_required_json_field_is_reported() {
    let def = summarize();
    let err = validate(&def, &params_from(json!({"max_words": 50})), &FileSet::new()).unwrap_err();

    let report = report_of(err);
    assert_eq!(report.get("text"), Some(&["Field is required".to_string()][..]));
    // Present, correctly-typed optional params produce no entries.
    assert!(!report.contains("max_words"));
    assert_eq!(report.len(), 1);
}

#[test]
fn extra_json_keys_are_rejected() {
    let def = definition(json!({
        "slug": "echo",
        "name": "Echo",
        "input_mode": "application/json",
        "params": [{"key": "text", "type": "json_string", "required": true}],
    }));
    let err = validate(
        &def,
        &params_from(json!({"text": "hi", "extra": "x"})),
        &FileSet::new(),
    )
    .unwrap_err();

    let report = report_of(err);
    assert_eq!(report.len(), 1);
    assert_eq!(report.get("extra"), Some(&["Unknown parameter".to_string()][..]));
}

#[test]
fn numeric_strings_are_not_numbers() {
    let def = summarize();

    let err = validate(
        &def,
        &params_from(json!({"text": "hi", "max_words": "42"})),
        &FileSet::new(),
    )
    .unwrap_err();
    assert_eq!(
        report_of(err).get("max_words"),
        Some(&["Must be a number".to_string()][..])
    );

    for count in [json!(42), json!(3.14)] {
        validate(
            &def,
            &params_from(json!({"text": "hi", "max_words": count})),
            &FileSet::new(),
        )
        .expect("integers and floats both conform");
    }
}

#[test]
fn object_and_array_checks_split_on_shape() {
    let def = definition(json!({
        "slug": "shapes",
        "name": "Shapes",
        "input_mode": "application/json",
        "params": [
            {"key": "meta", "type": "json_object"},
            {"key": "items", "type": "json_array"},
        ],
    }));

    let err = validate(
        &def,
        &params_from(json!({"meta": ["a", "b"], "items": {"k": "v"}})),
        &FileSet::new(),
    )
    .unwrap_err();

    let report = report_of(err);
    assert_eq!(report.get("meta"), Some(&["Must be an object".to_string()][..]));
    assert_eq!(report.get("items"), Some(&["Must be an array".to_string()][..]));

    validate(
        &def,
        &params_from(json!({"meta": {"k": "v"}, "items": ["a", "b"]})),
        &FileSet::new(),
    )
    .expect("correctly shaped values conform");
}

#[test]
fn form_data_mode_tolerates_undeclared_fields() {
    let def = definition(json!({
        "slug": "describe-image",
        "name": "Describe",
        "input_mode": "multipart/form-data",
        "params": [{"key": "description", "type": "form_data_text", "required": true}],
    }));

    validate(
        &def,
        &params_from(json!({"description": "x", "bogus": "y"})),
        &FileSet::new(),
    )
    .expect("form-data mode never reports unknown parameters");
}

#[test]
fn required_file_missing_or_unreadable() {
    let def = definition(json!({
        "slug": "ocr",
        "name": "OCR",
        "input_mode": "multipart/form-data",
        "params": [{"key": "document", "type": "form_data_file", "required": true}],
    }));

    let err = validate(&def, &Params::new(), &FileSet::new()).unwrap_err();
    assert_eq!(
        report_of(err).get("document"),
        Some(&["File is required".to_string()][..])
    );

    let files = FileSet::new().with("document", "/no/such/scan.pdf");
    let err = validate(&def, &Params::new(), &files).unwrap_err();
    assert_eq!(
        report_of(err).get("document"),
        Some(&["File is not readable: /no/such/scan.pdf".to_string()][..])
    );

    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(b"scan").unwrap();
    let files = FileSet::new().with("document", tmp.path());
    validate(&def, &Params::new(), &files).expect("readable file conforms");
}

#[test]
fn optional_file_may_be_absent() {
    let def = definition(json!({
        "slug": "ocr",
        "name": "OCR",
        "input_mode": "multipart/form-data",
        "params": [{"key": "attachment", "type": "form_data_file"}],
    }));
    validate(&def, &Params::new(), &FileSet::new()).expect("absent optional file is fine");
}

#[test]
fn empty_form_text_value_counts_as_missing() {
    let def = definition(json!({
        "slug": "tag",
        "name": "Tag",
        "input_mode": "multipart/form-data",
        "params": [{"key": "language", "type": "form_data_text", "required": true}],
    }));

    let err = validate(&def, &params_from(json!({"language": ""})), &FileSet::new()).unwrap_err();
    assert_eq!(
        report_of(err).get("language"),
        Some(&["Field is required".to_string()][..])
    );
}

#[test]
fn report_orders_declared_params_then_extra_keys() {
    let def = definition(json!({
        "slug": "ordered",
        "name": "Ordered",
        "input_mode": "application/json",
        "params": [
            {"key": "beta", "type": "json_string", "required": true},
            {"key": "alpha", "type": "json_number", "required": true},
        ],
    }));

    // Payload order: zulu, alpha, yankee. Declared errors come first in
    // declaration order, then extras in payload order.
    let err = validate(
        &def,
        &params_from(json!({"zulu": 1, "alpha": "nope", "yankee": 2})),
        &FileSet::new(),
    )
    .unwrap_err();

    let report = report_of(err);
    assert_eq!(
        report.fields().collect::<Vec<_>>(),
        vec!["beta", "alpha", "zulu", "yankee"]
    );
}

#[test]
fn validate_is_idempotent() {
    let def = summarize();
    let params = params_from(json!({"max_words": "many", "stray": true}));

    let first = report_of(validate(&def, &params, &FileSet::new()).unwrap_err());
    let second = report_of(validate(&def, &params, &FileSet::new()).unwrap_err());
    assert_eq!(first, second);
}

#[test]
fn default_value_is_never_substituted() {
    let def = definition(json!({
        "slug": "translate",
        "name": "Translate",
        "input_mode": "application/json",
        "params": [
            {"key": "target", "type": "json_string", "required": true, "default_value": "en"},
        ],
    }));

    let err = validate(&def, &Params::new(), &FileSet::new()).unwrap_err();
    assert_eq!(
        report_of(err).get("target"),
        Some(&["Field is required".to_string()][..])
    );
}

#[test]
fn mismatched_family_param_is_silently_skipped() {
    // A JSON-mode workflow declaring a form-file param has no validation
    // consequence; the remote validator is equally permissive.
    let def = definition(json!({
        "slug": "odd",
        "name": "Odd",
        "input_mode": "application/json",
        "params": [{"key": "upload", "type": "form_data_file"}],
    }));

    validate(&def, &params_from(json!({"upload": "anything"})), &FileSet::new())
        .expect("family/mode mismatch is not checked");
}
