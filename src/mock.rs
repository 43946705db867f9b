#![cfg(feature = "mock")]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use crate::{
    encode::{encode, EncodedRequest},
    errors::{Error, Result},
    files::FileSet,
    types::{Params, WorkflowDefinition},
};

/// In-memory mock configuration for offline tests.
#[derive(Default)]
pub struct MockConfig {
    pub definitions: Vec<WorkflowDefinition>,
    pub execute_results: Vec<Result<String>>,
}

impl MockConfig {
    pub fn with_definition(mut self, definition: WorkflowDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn with_execute_result(mut self, status_url: impl Into<String>) -> Self {
        self.execute_results.push(Ok(status_url.into()));
        self
    }

    pub fn with_execute_error(mut self, err: Error) -> Self {
        self.execute_results.push(Err(err));
        self
    }
}

/// One submission the mock transport received, in its encoded wire shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteCall {
    pub slug: String,
    pub request: EncodedRequest,
}

/// Offline stand-in for [`crate::WorkflowsClient`]: definitions come from a
/// fixed map, submissions pop queued results, and every dispatched request
/// is recorded so tests can assert on what reached the transport (or that
/// nothing did).
#[derive(Clone)]
pub struct MockWorkflowsClient {
    inner: Arc<MockInner>,
}

impl MockWorkflowsClient {
    pub fn new(cfg: MockConfig) -> Self {
        Self {
            inner: Arc::new(MockInner::new(cfg)),
        }
    }

    pub fn describe(&self, slug: &str) -> Result<Arc<WorkflowDefinition>> {
        self.inner
            .definitions
            .lock()
            .expect("lock poisoned")
            .get(slug)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                slug: slug.to_string(),
            })
    }

    pub fn execute(&self, slug: &str, params: &Params, files: &FileSet) -> Result<String> {
        let request = encode(slug, params, files)?;
        self.inner
            .execute_calls
            .lock()
            .expect("lock poisoned")
            .push(ExecuteCall {
                slug: slug.to_string(),
                request,
            });
        self.inner.next_execute()
    }

    pub fn validate_and_execute(
        &self,
        slug: &str,
        params: &Params,
        files: &FileSet,
    ) -> Result<String> {
        let definition = self.describe(slug)?;
        definition.validate(params, files)?;
        self.execute(slug, params, files)
    }

    /// Everything that reached the mock transport, in call order.
    pub fn execute_calls(&self) -> Vec<ExecuteCall> {
        self.inner
            .execute_calls
            .lock()
            .expect("lock poisoned")
            .clone()
    }
}

struct MockInner {
    definitions: Mutex<HashMap<String, Arc<WorkflowDefinition>>>,
    execute_results: Mutex<VecDeque<Result<String>>>,
    execute_calls: Mutex<Vec<ExecuteCall>>,
}

impl MockInner {
    fn new(cfg: MockConfig) -> Self {
        let definitions = cfg
            .definitions
            .into_iter()
            .map(|d| (d.slug.clone(), Arc::new(d)))
            .collect();
        Self {
            definitions: Mutex::new(definitions),
            execute_results: Mutex::new(VecDeque::from(cfg.execute_results)),
            execute_calls: Mutex::new(Vec::new()),
        }
    }

    fn next_execute(&self) -> Result<String> {
        self.execute_results
            .lock()
            .expect("lock poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(Error::Config("no mock execute result queued".into())))
    }
}

/// Ready-made workflow definitions for tests.
pub mod fixtures {
    use serde_json::json;

    use crate::types::WorkflowDefinition;

    /// JSON-mode workflow: required `text` string, optional `max_words`
    /// number.
    pub fn summarize_definition() -> WorkflowDefinition {
        WorkflowDefinition::from_descriptor(&json!({
            "slug": "summarize",
            "name": "Summarize",
            "input_mode": "application/json",
            "params": [
                {"key": "text", "type": "json_string", "required": true},
                {"key": "max_words", "type": "json_number"},
            ],
        }))
        .expect("fixture descriptor is valid")
    }

    /// Form-data workflow: required `document` file, required `language`
    /// text, optional `notes` text.
    pub fn ocr_definition() -> WorkflowDefinition {
        WorkflowDefinition::from_descriptor(&json!({
            "slug": "ocr",
            "name": "OCR",
            "input_mode": "multipart/form-data",
            "params": [
                {"key": "document", "type": "form_data_file", "required": true},
                {"key": "language", "type": "form_data_text", "required": true},
                {"key": "notes", "type": "form_data_text"},
            ],
        }))
        .expect("fixture descriptor is valid")
    }
}
