use std::fmt;

use tracing::debug;

use crate::backend::RsaObject;
use crate::error::{KeyError, Result};

/// Tag carried by a handle only while it owns a live key.
const RSA_KEY_MAGIC: u64 = 0x2a11_ed05_5e91_b281;

/// Opaque handle to one RSA key, private or public.
///
/// A fresh handle is empty. Importing or generating into it makes it valid;
/// [`RsaKey::free`] releases the key and empties it again, after which it may
/// be reused as an output. Dropping a valid handle releases its key too.
pub struct RsaKey {
    tag: u64,
    rsa: Option<RsaObject>,
}

impl RsaKey {
    pub const fn new() -> Self {
        Self { tag: 0, rsa: None }
    }

    pub fn is_valid(&self) -> bool {
        self.tag == RSA_KEY_MAGIC && self.rsa.is_some()
    }

    /// Release the owned key and return the handle to the empty state.
    ///
    /// Fails with `InvalidParameter` if the handle is not valid, so a second
    /// free of the same handle never releases anything twice.
    pub fn free(&mut self) -> Result<()> {
        if !self.is_valid() {
            return Err(KeyError::InvalidParameter("key handle is not valid"));
        }
        if let Some(rsa) = self.rsa.take() {
            debug!("releasing {}-bit RSA key", rsa.bits());
        }
        self.clear();
        Ok(())
    }

    /// Key object of a valid handle.
    pub(crate) fn object(&self) -> Result<&RsaObject> {
        match &self.rsa {
            Some(rsa) if self.tag == RSA_KEY_MAGIC => Ok(rsa),
            _ => Err(KeyError::InvalidParameter("key handle is not valid")),
        }
    }

    /// Take ownership of `rsa`, making the handle valid.
    pub(crate) fn assign(&mut self, rsa: RsaObject) {
        self.tag = RSA_KEY_MAGIC;
        self.rsa = Some(rsa);
    }

    pub(crate) fn clear(&mut self) {
        self.tag = 0;
        self.rsa = None;
    }
}

impl Default for RsaKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RsaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.object() {
            Ok(rsa) => f
                .debug_struct("RsaKey")
                .field("bits", &rsa.bits())
                .field("private", &rsa.is_private())
                .finish(),
            Err(_) => f.write_str("RsaKey(empty)"),
        }
    }
}
