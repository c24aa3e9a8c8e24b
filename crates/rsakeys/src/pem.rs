//! PEM import and export.
//!
//! Input PEM must end in exactly one null byte, with no other null byte
//! before it. Exported PEM carries the same terminator, and exports follow
//! the size negotiation protocol: an output that is too small yields
//! `BufferTooSmall { required }` and nothing is written.

use tracing::debug;
use zeroize::Zeroizing;

use crate::backend::{CryptoBackend, MemStream, PublicKeyInfo};
use crate::error::{KeyError, Result};
use crate::key::RsaKey;
use crate::manager::{negotiate, KeyManager};

/// Check the terminator rule and return the PEM text without it.
pub(crate) fn check_null_terminator(data: &[u8]) -> Result<&[u8]> {
    if data.is_empty() {
        return Err(KeyError::InvalidParameter("PEM data is empty"));
    }
    match data.iter().position(|&b| b == 0) {
        Some(pos) if pos == data.len() - 1 => Ok(&data[..pos]),
        Some(_) => Err(KeyError::InvalidParameter("PEM data has an embedded null byte")),
        None => Err(KeyError::InvalidParameter("PEM data is not null-terminated")),
    }
}

impl<B: CryptoBackend> KeyManager<B> {
    /// Parse a null-terminated private key PEM into `key`.
    ///
    /// `key` is emptied first, so it is left empty on every failure.
    pub fn import_private_key(&self, pem: &[u8], key: &mut RsaKey) -> Result<()> {
        key.clear();

        let text = check_null_terminator(pem)?;
        self.backend.init();

        let rsa = self.backend.read_private_pem(text)?;
        debug!("imported {}-bit RSA private key", rsa.bits());
        key.assign(rsa);
        Ok(())
    }

    /// Parse a null-terminated SubjectPublicKeyInfo PEM into `key`.
    pub fn import_public_key(&self, pem: &[u8], key: &mut RsaKey) -> Result<()> {
        key.clear();

        let text = check_null_terminator(pem)?;
        self.backend.init();

        let info = self.backend.read_public_pem(text)?;
        // Take our own share before the wrapper goes away with its one.
        let rsa = info.get_rsa();
        drop(info);

        debug!("imported {}-bit RSA public key", rsa.bits());
        key.assign(rsa);
        Ok(())
    }

    /// Write the private key as null-terminated PEM into `out`, returning the
    /// number of bytes written.
    pub fn export_private_key(&self, key: &RsaKey, out: &mut [u8]) -> Result<usize> {
        let rsa = key.object()?;
        self.backend.init();

        let mut stream = MemStream::new();
        self.backend.write_private_pem(rsa, &mut stream)?;
        stream.terminate().map_err(|e| KeyError::Failure(e.to_string()))?;

        stream.copy_out(out)
    }

    /// Write the public component of `key` as null-terminated PEM into `out`.
    /// Works on private and public handles alike.
    pub fn export_public_key(&self, key: &RsaKey, out: &mut [u8]) -> Result<usize> {
        let rsa = key.object()?;
        self.backend.init();

        let mut stream = MemStream::new();
        {
            // The wrapper holds its own share, released when it drops here.
            let info = PublicKeyInfo::assign(rsa.clone());
            self.backend.write_public_pem(&info, &mut stream)?;
        }
        stream.terminate().map_err(|e| KeyError::Failure(e.to_string()))?;

        stream.copy_out(out)
    }

    /// [`export_private_key`](Self::export_private_key) into an owned buffer
    /// that is wiped on drop.
    pub fn export_private_key_to_vec(&self, key: &RsaKey) -> Result<Zeroizing<Vec<u8>>> {
        negotiate(|out| self.export_private_key(key, out)).map(Zeroizing::new)
    }

    pub fn export_public_key_to_vec(&self, key: &RsaKey) -> Result<Vec<u8>> {
        negotiate(|out| self.export_public_key(key, out))
    }

    /// Materialise a public-key handle from any valid handle by exporting its
    /// public PEM and importing it again.
    pub fn derive_public_key(&self, key: &RsaKey, public_key: &mut RsaKey) -> Result<()> {
        public_key.clear();
        let pem = self.export_public_key_to_vec(key)?;
        self.import_public_key(&pem, public_key)
    }
}
