//! Shared helpers for trigger tests

use std::sync::Arc;

use bytes::Bytes;
use edgeflow_pipeline::{Dispatcher, MemoryRetryStore};
use edgeflow_protocol::Payload;
use edgeflow_secrets::MemorySecretStore;
use edgeflow_transform::{
    Chain, FunctionContext, Outcome, TransformError, TransformFuture, Transformer,
};

/// Responds with a fixed body and content type
pub struct Respond(pub &'static str, pub &'static str);

impl Transformer for Respond {
    fn transform<'a>(
        &'a self,
        ctx: &'a mut FunctionContext,
        _input: Option<Payload>,
    ) -> TransformFuture<'a> {
        Box::pin(async move {
            ctx.set_response_data(Bytes::from_static(self.0.as_bytes()));
            ctx.set_response_content_type(self.1);
            Ok(Outcome::Continue(None))
        })
    }

    fn name(&self) -> &'static str {
        "respond"
    }
}

/// Echoes its input back as the response
pub struct Echo;

impl Transformer for Echo {
    fn transform<'a>(
        &'a self,
        ctx: &'a mut FunctionContext,
        input: Option<Payload>,
    ) -> TransformFuture<'a> {
        Box::pin(async move {
            if let Some(Payload::Bytes(bytes)) = input {
                ctx.set_response_data(bytes);
            }
            Ok(Outcome::Continue(None))
        })
    }

    fn name(&self) -> &'static str {
        "echo"
    }
}

/// Finishes without a response
pub struct Silent;

impl Transformer for Silent {
    fn transform<'a>(
        &'a self,
        _ctx: &'a mut FunctionContext,
        _input: Option<Payload>,
    ) -> TransformFuture<'a> {
        Box::pin(async move { Ok(Outcome::Stop) })
    }

    fn name(&self) -> &'static str {
        "silent"
    }
}

/// Always fails
pub struct Fail;

impl Transformer for Fail {
    fn transform<'a>(
        &'a self,
        _ctx: &'a mut FunctionContext,
        _input: Option<Payload>,
    ) -> TransformFuture<'a> {
        Box::pin(async move { Err(TransformError::transport("unreachable")) })
    }

    fn name(&self) -> &'static str {
        "fail"
    }
}

pub fn chain<T: Transformer + 'static>(function: T) -> Chain {
    Chain::new(vec![Arc::new(function) as Arc<dyn Transformer>])
}

pub fn dispatcher() -> Dispatcher {
    Dispatcher::new(
        Arc::new(MemorySecretStore::new()),
        Arc::new(MemoryRetryStore::new()),
    )
}
