use std::ffi::{c_int, c_ulong};

use tracing::{debug, warn};

use crate::backend::{CryptoBackend, MemStream, PublicKeyInfo};
use crate::error::{KeyError, Result};
use crate::key::RsaKey;
use crate::manager::KeyManager;

/// Conventional public exponent (F4).
pub const DEFAULT_EXPONENT: u64 = 65_537;

impl<B: CryptoBackend> KeyManager<B> {
    /// Generate a key pair of `bits` with public exponent `exponent` into
    /// `private_key` and `public_key`.
    ///
    /// Both handles are produced by importing freshly serialised PEM, so they
    /// go through the same checks as externally supplied keys. On failure
    /// neither handle is left valid.
    pub fn generate_key_pair(
        &self,
        bits: u64,
        exponent: u64,
        private_key: &mut RsaKey,
        public_key: &mut RsaKey,
    ) -> Result<()> {
        private_key.clear();
        public_key.clear();

        let bits = c_int::try_from(bits)
            .map_err(|_| KeyError::InvalidParameter("modulus bit length out of range"))?;
        let exponent = c_ulong::try_from(exponent)
            .map_err(|_| KeyError::InvalidParameter("public exponent out of range"))?;

        self.backend.init();

        let result = self.generate_into(bits, exponent, private_key, public_key);

        if let Err(e) = &result {
            warn!("key pair generation failed: {}", e);
            if private_key.is_valid() {
                private_key.free()?;
            }
            if public_key.is_valid() {
                public_key.free()?;
            }
        }
        result
    }

    fn generate_into(
        &self,
        bits: c_int,
        exponent: c_ulong,
        private_key: &mut RsaKey,
        public_key: &mut RsaKey,
    ) -> Result<()> {
        let rsa = self.backend.generate(bits, exponent)?;
        debug!("generated {}-bit RSA key pair", rsa.bits());

        {
            let mut stream = MemStream::new();
            self.backend.write_private_pem(&rsa, &mut stream)?;
            stream.terminate().map_err(|e| KeyError::Failure(e.to_string()))?;

            self.import_private_key(stream.as_bytes(), private_key)
                .map_err(|e| KeyError::Failure(format!("re-import of private key: {e}")))?;
        }

        {
            let info = PublicKeyInfo::assign(rsa);
            let mut stream = MemStream::new();
            self.backend.write_public_pem(&info, &mut stream)?;
            stream.terminate().map_err(|e| KeyError::Failure(e.to_string()))?;

            self.import_public_key(stream.as_bytes(), public_key)
                .map_err(|e| KeyError::Failure(format!("re-import of public key: {e}")))?;
        }

        Ok(())
    }
}
