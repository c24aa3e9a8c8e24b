//! Public key parameters of a handle.

use rsa::BigUint;

use crate::backend::CryptoBackend;
use crate::error::{KeyError, Result};
use crate::key::RsaKey;
use crate::manager::KeyManager;

fn copy_be(value: &BigUint, out: &mut [u8]) -> Result<usize> {
    let bytes = value.to_bytes_be();
    if out.len() < bytes.len() {
        return Err(KeyError::BufferTooSmall { required: bytes.len() });
    }
    out[..bytes.len()].copy_from_slice(&bytes);
    Ok(bytes.len())
}

impl<B: CryptoBackend> KeyManager<B> {
    /// Length in bytes of every signature `key` produces.
    pub fn signature_size(&self, key: &RsaKey) -> Result<usize> {
        Ok(key.object()?.size())
    }

    /// Big-endian modulus, with the usual size negotiation.
    pub fn modulus(&self, key: &RsaKey, out: &mut [u8]) -> Result<usize> {
        let rsa = key.object()?;
        self.backend.init();
        copy_be(rsa.modulus(), out)
    }

    /// Big-endian public exponent, with the usual size negotiation.
    pub fn exponent(&self, key: &RsaKey, out: &mut [u8]) -> Result<usize> {
        let rsa = key.object()?;
        self.backend.init();
        copy_be(rsa.exponent(), out)
    }

    /// Whether two handles carry the same public key. A private handle equals
    /// the public handle of its own pair.
    pub fn public_keys_equal(&self, a: &RsaKey, b: &RsaKey) -> Result<bool> {
        let a = a.object()?;
        let b = b.object()?;
        self.backend.init();
        Ok(a.modulus() == b.modulus() && a.exponent() == b.exponent())
    }
}
