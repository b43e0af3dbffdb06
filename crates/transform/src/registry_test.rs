//! Tests for function registry

use super::*;
use crate::test_util::test_context;
use crate::{FunctionContext, Outcome, TransformFuture};
use edgeflow_protocol::Payload;

struct Echo;

impl Transformer for Echo {
    fn transform<'a>(&'a self, _: &'a mut FunctionContext, input: Option<Payload>) -> TransformFuture<'a> {
        Box::pin(async move { Ok(Outcome::Continue(input)) })
    }

    fn name(&self) -> &'static str {
        "echo"
    }
}

struct EchoFactory;

impl FunctionFactory for EchoFactory {
    fn create(&self, _config: &FunctionConfig) -> TransformResult<Arc<dyn Transformer>> {
        Ok(Arc::new(Echo))
    }

    fn name(&self) -> &'static str {
        "echo"
    }
}

#[test]
fn test_empty_registry() {
    let registry = FunctionRegistry::new();
    assert!(registry.is_empty());
    assert_eq!(registry.len(), 0);
    assert!(registry.available_types().is_empty());
}

#[tokio::test]
async fn test_register_and_create() {
    let mut registry = FunctionRegistry::default();
    registry.register("echo", EchoFactory);
    assert!(registry.contains("echo"));
    assert!(!registry.contains("nonexistent"));

    let function = registry.create(&FunctionConfig::new("echo")).unwrap();
    let mut ctx = test_context();
    let out = function
        .transform(&mut ctx, Some(Payload::from("x")))
        .await
        .unwrap();
    assert_eq!(out, Outcome::next("x"));
}

#[test]
fn test_register_replaces() {
    let mut registry = FunctionRegistry::new();
    registry.register("echo", EchoFactory);
    registry.register("echo", EchoFactory);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_unknown_type_lists_available() {
    let mut registry = FunctionRegistry::new();
    registry.register("zeta", EchoFactory);
    registry.register("alpha", EchoFactory);

    let err = registry.create(&FunctionConfig::new("missing")).err().unwrap();
    assert_eq!(
        err.to_string(),
        "invalid configuration: unknown function type 'missing', available: [alpha, zeta]"
    );
}

#[test]
fn test_required_helpers() {
    let config = FunctionConfig::new("echo")
        .with_option("names", "a, b")
        .with_option("empty", "");

    assert_eq!(required_list(&config, "names").unwrap(), vec!["a", "b"]);
    assert!(required_list(&config, "absent").is_err());
    assert!(required_str(&config, "empty").is_err());
    assert_eq!(required_str(&config, "names").unwrap(), "a, b");
}
