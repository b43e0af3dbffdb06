//! AES-256-CBC with HMAC-SHA-512 authentication
//!
//! Encrypt-then-MAC composition. The 64-byte key splits into a MAC key
//! (first 32 bytes) and an encryption key (last 32 bytes). The tag is
//! HMAC-SHA-512 over `AD || IV || C || AL` truncated to 32 bytes, where `AL`
//! is the bit length of `AD` as a 64-bit big-endian integer.
//!
//! Sealed layout: `IV (16) || C (PKCS#7 padded) || tag (32)`.

use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::{TransformError, TransformResult};

type HmacSha512 = Hmac<Sha512>;

/// Combined key length
pub const KEY_SIZE: usize = 64;

/// IV length
pub const NONCE_SIZE: usize = 16;

/// Truncated tag length
pub const TAG_SIZE: usize = 32;

const BLOCK_SIZE: usize = 16;
const HALF_KEY: usize = KEY_SIZE / 2;

/// AEAD cipher keyed with a 64-byte key
///
/// Key halves are wiped when the cipher is dropped.
pub struct Aes256CbcHmacSha512 {
    mac_key: Zeroizing<[u8; HALF_KEY]>,
    enc_key: Zeroizing<[u8; HALF_KEY]>,
}

impl Aes256CbcHmacSha512 {
    /// # Errors
    /// `TransformError::Crypto` unless `key` is exactly 64 bytes
    pub fn new(key: &[u8]) -> TransformResult<Self> {
        if key.len() != KEY_SIZE {
            return Err(TransformError::crypto(format!(
                "invalid key length {}, expected {KEY_SIZE}",
                key.len()
            )));
        }
        let mut mac_key = Zeroizing::new([0u8; HALF_KEY]);
        let mut enc_key = Zeroizing::new([0u8; HALF_KEY]);
        mac_key.copy_from_slice(&key[..HALF_KEY]);
        enc_key.copy_from_slice(&key[HALF_KEY..]);
        Ok(Self { mac_key, enc_key })
    }

    pub fn nonce_size(&self) -> usize {
        NONCE_SIZE
    }

    /// Maximum bytes added to a plaintext: IV, one full padding block and the tag
    pub fn overhead(&self) -> usize {
        NONCE_SIZE + BLOCK_SIZE + TAG_SIZE
    }

    /// Encrypt and authenticate `plaintext`, binding `ad`
    pub fn seal(
        &self,
        nonce: &[u8; NONCE_SIZE],
        plaintext: &[u8],
        ad: &[u8],
    ) -> TransformResult<Vec<u8>> {
        let ciphertext = cbc::Encryptor::<Aes256>::new((&*self.enc_key).into(), nonce.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);
        let tag = self.tag(ad, nonce, &ciphertext)?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len() + TAG_SIZE);
        sealed.extend_from_slice(nonce);
        sealed.extend_from_slice(&ciphertext);
        sealed.extend_from_slice(&tag);
        Ok(sealed)
    }

    /// Verify and decrypt output of [`seal`](Self::seal)
    ///
    /// # Errors
    /// `TransformError::Crypto` on malformed input, tag mismatch or bad padding
    pub fn open(&self, sealed: &[u8], ad: &[u8]) -> TransformResult<Vec<u8>> {
        if sealed.len() < NONCE_SIZE + BLOCK_SIZE + TAG_SIZE
            || (sealed.len() - NONCE_SIZE - TAG_SIZE) % BLOCK_SIZE != 0
        {
            return Err(TransformError::crypto("message authentication failed"));
        }
        let (nonce, rest) = sealed.split_at(NONCE_SIZE);
        let (ciphertext, tag) = rest.split_at(rest.len() - TAG_SIZE);

        let expected = self.tag(ad, nonce, ciphertext)?;
        if !bool::from(expected.as_slice().ct_eq(tag)) {
            return Err(TransformError::crypto("message authentication failed"));
        }

        cbc::Decryptor::<Aes256>::new((&*self.enc_key).into(), nonce.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| TransformError::crypto("message authentication failed"))
    }

    fn tag(&self, ad: &[u8], nonce: &[u8], ciphertext: &[u8]) -> TransformResult<[u8; TAG_SIZE]> {
        let mut mac = <HmacSha512 as Mac>::new_from_slice(&self.mac_key[..])
            .map_err(|e| TransformError::crypto(e.to_string()))?;
        mac.update(ad);
        mac.update(nonce);
        mac.update(ciphertext);
        mac.update(&((ad.len() as u64) * 8).to_be_bytes());
        let full = mac.finalize().into_bytes();

        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&full[..TAG_SIZE]);
        Ok(tag)
    }
}

impl std::fmt::Debug for Aes256CbcHmacSha512 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aes256CbcHmacSha512").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "aead_test.rs"]
mod tests;
