use crate::backend::CryptoBackend;
use crate::error::{KeyError, Result};
use crate::rustcrypto::RustCryptoBackend;

/// Entry point for every operation on [`RsaKey`](crate::RsaKey) handles.
///
/// Operations validate their parameters, initialise the backend, then
/// delegate to it, translating backend errors into [`KeyError`].
#[derive(Debug, Default, Clone)]
pub struct KeyManager<B = RustCryptoBackend> {
    pub(crate) backend: B,
}

impl KeyManager<RustCryptoBackend> {
    pub fn new() -> Self {
        Self::with_backend(RustCryptoBackend::new())
    }
}

impl<B: CryptoBackend> KeyManager<B> {
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

/// Run a size-negotiating operation twice: once to learn the size, once into a
/// buffer of exactly that size.
pub fn negotiate<F>(mut op: F) -> Result<Vec<u8>>
where
    F: FnMut(&mut [u8]) -> Result<usize>,
{
    let required = match op(&mut []) {
        Ok(0) => return Ok(Vec::new()),
        Ok(n) => return Err(KeyError::Unexpected(format!("{n} bytes written to an empty buffer"))),
        Err(KeyError::BufferTooSmall { required }) => required,
        Err(e) => return Err(e),
    };

    let mut buf = vec![0u8; required];
    let written = op(&mut buf)?;
    buf.truncate(written);
    Ok(buf)
}
