//! In-memory registry shared by the engine integration tests

#![allow(dead_code)]

use artprov::artifactory::http::ApiError;
use artprov::provision::RegistryApi;
use artprov::resource::{Params, ResourceKind};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Registry call recorded by [`MemoryRegistry`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Fetch(ResourceKind, String),
    Create(ResourceKind, String),
    Update(ResourceKind, String),
    Delete(ResourceKind, String),
}

/// Stores resources by (kind, key) and fails on demand
#[derive(Default)]
pub struct MemoryRegistry {
    items: Mutex<BTreeMap<(ResourceKind, String), Value>>,
    calls: Mutex<Vec<Call>>,
    /// Keys whose every call fails with this HTTP status
    failures: Mutex<BTreeMap<String, u16>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, kind: ResourceKind, key: &str, state: Value) {
        self.items
            .lock()
            .unwrap()
            .insert((kind, key.to_string()), state);
    }

    pub fn fail_on(&self, key: &str, status: u16) {
        self.failures
            .lock()
            .unwrap()
            .insert(key.to_string(), status);
    }

    pub fn get(&self, kind: ResourceKind, key: &str) -> Option<Value> {
        self.items
            .lock()
            .unwrap()
            .get(&(kind, key.to_string()))
            .cloned()
    }

    pub fn contains(&self, kind: ResourceKind, key: &str) -> bool {
        self.get(kind, key).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn create_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Create(..)))
            .count()
    }

    fn record(&self, call: Call, key: &str) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(call);
        match self.failures.lock().unwrap().get(key) {
            Some(status) => Err(ApiError::Status {
                status: *status,
                message: format!("injected failure for {}", key),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RegistryApi for MemoryRegistry {
    async fn fetch(&self, kind: ResourceKind, key: &str) -> Result<Value, ApiError> {
        self.record(Call::Fetch(kind, key.to_string()), key)?;
        self.get(kind, key).ok_or_else(|| ApiError::NotFound {
            url: format!("memory://{}/{}", kind, key),
        })
    }

    async fn create(&self, kind: ResourceKind, key: &str, body: &Value) -> Result<Value, ApiError> {
        self.record(Call::Create(kind, key.to_string()), key)?;
        self.seed(kind, key, body.clone());
        Ok(Value::Null)
    }

    async fn update(&self, kind: ResourceKind, key: &str, body: &Value) -> Result<Value, ApiError> {
        self.record(Call::Update(kind, key.to_string()), key)?;
        self.seed(kind, key, body.clone());
        Ok(Value::Null)
    }

    async fn delete(&self, kind: ResourceKind, key: &str) -> Result<Value, ApiError> {
        self.record(Call::Delete(kind, key.to_string()), key)?;
        self.items.lock().unwrap().remove(&(kind, key.to_string()));
        Ok(Value::Null)
    }
}

/// Parameter map from a JSON object literal
pub fn params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}
