use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::types::WorkflowDefinition;

/// In-memory cache of described workflows, keyed by slug.
///
/// An explicit collaborator rather than hidden client state: the client
/// consults it before fetching, and callers can evict one slug or clear
/// everything when a workflow definition changes remotely. Definitions are
/// handed out as `Arc`s; they are immutable, so shared reads are safe.
#[derive(Debug, Default)]
pub struct DescribeCache {
    entries: Mutex<HashMap<String, Arc<WorkflowDefinition>>>,
}

impl DescribeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slug: &str) -> Option<Arc<WorkflowDefinition>> {
        self.entries.lock().expect("lock poisoned").get(slug).cloned()
    }

    /// Store a definition under its own slug and return the shared handle.
    pub fn insert(&self, definition: WorkflowDefinition) -> Arc<WorkflowDefinition> {
        let definition = Arc::new(definition);
        self.entries
            .lock()
            .expect("lock poisoned")
            .insert(definition.slug.clone(), definition.clone());
        definition
    }

    pub fn evict(&self, slug: &str) {
        self.entries.lock().expect("lock poisoned").remove(slug);
    }

    pub fn clear(&self) {
        self.entries.lock().expect("lock poisoned").clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
