//! Encryption Transformer - AES-256-CBC + HMAC-SHA-512
//!
//! The key is read from the secret store on every call, so rotating the
//! secret takes effect on the next message. The secret value is the 64-byte
//! key hex-encoded. Output is `base64(IV || ciphertext || tag)` with a fresh
//! random IV per message.
//!
//! ```toml
//! [functions.encrypt]
//! type = "encrypt_aes256"
//! secret_path = "aes"
//! secret_name = "key"
//! ```

mod aead;

pub use aead::{Aes256CbcHmacSha512, KEY_SIZE, NONCE_SIZE, TAG_SIZE};

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use edgeflow_config::FunctionConfig;
use edgeflow_protocol::{CONTENT_TYPE_TEXT, Payload, coerce};
use rand::TryRngCore;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::registry::{FunctionFactory, required_str};
use crate::{
    FunctionContext, Outcome, TransformError, TransformFuture, TransformResult, Transformer,
    require_input,
};

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

/// Encrypts its input with a key held in the secret store
#[derive(Debug, Clone)]
pub struct AesProtection {
    secret_path: String,
    secret_name: String,
}

impl AesProtection {
    pub fn new(secret_path: impl Into<String>, secret_name: impl Into<String>) -> Self {
        Self {
            secret_path: secret_path.into(),
            secret_name: secret_name.into(),
        }
    }

    async fn load_cipher(&self, ctx: &FunctionContext) -> TransformResult<Aes256CbcHmacSha512> {
        let mut secrets = ctx
            .get_secret(&self.secret_path, &[self.secret_name.as_str()])
            .await?;
        let encoded = Zeroizing::new(secrets.remove(&self.secret_name).unwrap_or_default());
        if encoded.is_empty() {
            return Err(TransformError::crypto(format!(
                "aes256 key at '{}/{}' is empty",
                self.secret_path, self.secret_name
            )));
        }

        let key = Zeroizing::new(
            hex::decode(encoded.trim())
                .map_err(|e| TransformError::crypto(format!("aes256 key is not valid hex: {e}")))?,
        );
        Aes256CbcHmacSha512::new(&key)
    }
}

impl Transformer for AesProtection {
    fn transform<'a>(
        &'a self,
        ctx: &'a mut FunctionContext,
        input: Option<Payload>,
    ) -> TransformFuture<'a> {
        Box::pin(async move {
            let input = require_input(self.name(), ctx, input)?;
            let data = coerce(&input)?;
            let cipher = self.load_cipher(ctx).await?;

            let mut nonce = [0u8; NONCE_SIZE];
            OsRng
                .try_fill_bytes(&mut nonce)
                .map_err(|e| TransformError::crypto(format!("failed to generate iv: {e}")))?;

            let sealed = cipher.seal(&nonce, &data, &[])?;
            tracing::trace!(
                plaintext_len = data.len(),
                sealed_len = sealed.len(),
                "payload encrypted"
            );

            ctx.set_response_content_type(CONTENT_TYPE_TEXT);
            Ok(Outcome::next(Bytes::from(STANDARD.encode(sealed))))
        })
    }

    fn name(&self) -> &'static str {
        "encrypt_aes256"
    }
}

/// Factory for `encrypt_aes256`
pub struct EncryptionFactory;

impl FunctionFactory for EncryptionFactory {
    fn create(&self, config: &FunctionConfig) -> TransformResult<Arc<dyn Transformer>> {
        let path = required_str(config, "secret_path")?;
        let name = required_str(config, "secret_name")?;
        Ok(Arc::new(AesProtection::new(path, name)))
    }

    fn name(&self) -> &'static str {
        "encrypt_aes256"
    }
}
