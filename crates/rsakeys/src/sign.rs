//! PKCS#1 v1.5 signing and verification over caller-supplied digests.

use tracing::{debug, error};

use crate::backend::CryptoBackend;
use crate::error::{KeyError, Result};
use crate::hash::HashType;
use crate::key::RsaKey;
use crate::manager::{negotiate, KeyManager};

impl<B: CryptoBackend> KeyManager<B> {
    /// Sign `digest` with a private key into `signature`.
    ///
    /// The signature is always exactly the modulus length; a smaller
    /// `signature` fails with `BufferTooSmall` carrying that length.
    pub fn sign(
        &self,
        private_key: &RsaKey,
        hash_type: HashType,
        digest: &[u8],
        signature: &mut [u8],
    ) -> Result<usize> {
        let rsa = private_key.object()?;
        if digest.is_empty() {
            return Err(KeyError::InvalidParameter("digest is empty"));
        }

        self.backend.init();

        let size = rsa.size();
        if signature.len() < size {
            return Err(KeyError::BufferTooSmall { required: size });
        }

        let written = self
            .backend
            .sign(hash_type, digest, &mut signature[..size], rsa)?;

        if written != size {
            error!("{} signature is {} bytes, modulus is {}", hash_type, written, size);
            return Err(KeyError::Unexpected(format!(
                "signature length {written} does not match modulus length {size}"
            )));
        }

        debug!("signed {}-byte {} digest", digest.len(), hash_type);
        Ok(size)
    }

    pub fn sign_to_vec(&self, private_key: &RsaKey, hash_type: HashType, digest: &[u8]) -> Result<Vec<u8>> {
        negotiate(|out| self.sign(private_key, hash_type, digest, out))
    }

    /// Check `signature` over `digest`. Any mismatch, including a malformed
    /// signature, is reported as `Failure`.
    pub fn verify(
        &self,
        public_key: &RsaKey,
        hash_type: HashType,
        digest: &[u8],
        signature: &[u8],
    ) -> Result<()> {
        let rsa = public_key.object()?;
        if digest.is_empty() {
            return Err(KeyError::InvalidParameter("digest is empty"));
        }
        if signature.is_empty() {
            return Err(KeyError::InvalidParameter("signature is empty"));
        }

        self.backend.init();

        self.backend
            .verify(hash_type, digest, signature, rsa)
            .map_err(|e| KeyError::Failure(format!("signature verification failed: {e}")))
    }
}
