//! Shared helpers for unit tests

use std::sync::Arc;

use edgeflow_protocol::{Event, ValueType};
use edgeflow_secrets::MemorySecretStore;

use crate::FunctionContext;

/// Context for pipeline `test-pipeline` backed by a fresh secret store
pub fn test_context() -> FunctionContext {
    context_with_store(MemorySecretStore::new())
}

pub fn context_with_store(store: MemorySecretStore) -> FunctionContext {
    FunctionContext::new("corr-1", "application/json", "test-pipeline", Arc::new(store))
}

/// Event from device `X` with one Int32 reading `r = 42`
pub fn sample_event() -> Event {
    let mut event = Event::new("profile", "X", "source");
    event.add_simple_reading("r", ValueType::INT32, "42");
    event
}
