//! Compression Transformer - Gzip / zlib with base64 output
//!
//! Input is coerced to bytes, compressed by a pooled encoder, and emitted
//! as base64 text. Encoders keep their deflate state and output buffer
//! across calls and reset both before each message. The pool is shared by
//! every pipeline that runs the same function instance.
//!
//! ```toml
//! [functions.gzip]
//! type = "compress_gzip"
//! ```

mod encoder;
mod pool;

pub use encoder::Encoder;
pub use pool::{Pool, PoolMetrics, PoolSnapshot};

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use edgeflow_config::FunctionConfig;
use edgeflow_protocol::{CONTENT_TYPE_TEXT, Payload, coerce};

use crate::registry::FunctionFactory;
use crate::{
    FunctionContext, Outcome, TransformFuture, TransformResult, Transformer, require_input,
};

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

/// Idle encoders kept per transformer
const DEFAULT_POOL_SIZE: usize = 16;

/// Initial output capacity of each encoder
const DEFAULT_BUFFER_CAPACITY: usize = 4 * 1024;

/// Compression algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionAlgorithm {
    Gzip,
    Zlib,
}

impl CompressionAlgorithm {
    pub fn function_name(self) -> &'static str {
        match self {
            Self::Gzip => "compress_gzip",
            Self::Zlib => "compress_zlib",
        }
    }
}

/// Compresses its input and base64-encodes the result
pub struct CompressionTransformer {
    algorithm: CompressionAlgorithm,
    pool: Pool<Encoder>,
}

impl CompressionTransformer {
    pub fn new(algorithm: CompressionAlgorithm) -> Self {
        Self::with_pool_size(algorithm, DEFAULT_POOL_SIZE)
    }

    /// Keep up to `pool_size` idle encoders
    pub fn with_pool_size(algorithm: CompressionAlgorithm, pool_size: usize) -> Self {
        Self {
            algorithm,
            pool: Pool::new(pool_size),
        }
    }

    pub fn gzip() -> Self {
        Self::new(CompressionAlgorithm::Gzip)
    }

    pub fn zlib() -> Self {
        Self::new(CompressionAlgorithm::Zlib)
    }

    pub fn algorithm(&self) -> CompressionAlgorithm {
        self.algorithm
    }

    pub fn pool(&self) -> &Pool<Encoder> {
        &self.pool
    }

    /// Compress `data` and return it base64-encoded
    pub fn compress(&self, data: &[u8]) -> TransformResult<String> {
        let mut encoder = self
            .pool
            .get_or(|| Encoder::new(self.algorithm, DEFAULT_BUFFER_CAPACITY));
        let encoded = encoder.compress(data).map(|out| STANDARD.encode(out));
        self.pool.put(encoder);
        Ok(encoded?)
    }
}

impl Transformer for CompressionTransformer {
    fn transform<'a>(
        &'a self,
        ctx: &'a mut FunctionContext,
        input: Option<Payload>,
    ) -> TransformFuture<'a> {
        Box::pin(async move {
            let input = require_input(self.name(), ctx, input)?;
            let data = coerce(&input)?;
            let encoded = self.compress(&data)?;

            ctx.set_response_content_type(CONTENT_TYPE_TEXT);
            Ok(Outcome::next(Bytes::from(encoded)))
        })
    }

    fn name(&self) -> &'static str {
        self.algorithm.function_name()
    }
}

/// Factory for one compression algorithm
pub struct CompressionFactory {
    algorithm: CompressionAlgorithm,
}

impl CompressionFactory {
    pub fn new(algorithm: CompressionAlgorithm) -> Self {
        Self { algorithm }
    }
}

impl FunctionFactory for CompressionFactory {
    fn create(&self, _config: &FunctionConfig) -> TransformResult<Arc<dyn Transformer>> {
        Ok(Arc::new(CompressionTransformer::new(self.algorithm)))
    }

    fn name(&self) -> &'static str {
        self.algorithm.function_name()
    }
}
