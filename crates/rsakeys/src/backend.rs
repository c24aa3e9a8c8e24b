//! The cryptographic primitives the key manager delegates to.
//!
//! A backend parses and serialises PEM, signs and verifies under PKCS#1 v1.5,
//! and generates key pairs. It works on [`RsaObject`], a reference-counted key
//! object; handles own one share each and wrappers such as [`PublicKeyInfo`]
//! hold a share only for as long as they live.

use std::ffi::{c_int, c_ulong};
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Once};

use rand::{rngs::OsRng, RngCore};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use thiserror::Error;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::error::{KeyError, Result};
use crate::hash::HashType;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("PEM data is not valid UTF-8")]
    NotUtf8(#[from] std::str::Utf8Error),

    #[error("PEM decode failed: {0}")]
    Decode(String),

    #[error("PEM encode failed: {0}")]
    Encode(String),

    #[error("RSA operation failed: {0}")]
    Rsa(#[from] rsa::Error),

    #[error("memory stream: {0}")]
    Stream(#[from] io::Error),

    #[error("key object has no private component")]
    NotPrivate,

    #[error("unsupported public exponent {0}")]
    Exponent(u64),

    #[error("unsupported modulus length {0} bits")]
    ModulusBits(i64),

    #[error("signature of {0} bytes does not fit the output")]
    SignatureOverflow(usize),
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

static INIT: Once = Once::new();

/// Process-wide backend initialisation. Idempotent; concurrent first calls
/// are serialised and only one of them runs the setup.
pub fn initialize() {
    INIT.call_once(|| {
        let mut probe = [0u8; 1];
        match OsRng.try_fill_bytes(&mut probe) {
            Ok(()) => debug!("crypto backend initialized"),
            Err(e) => warn!("crypto backend initialized without entropy source: {}", e),
        }
    });
}

pub fn is_initialized() -> bool {
    INIT.is_completed()
}

/// Operations the key manager needs from a cryptographic library.
pub trait CryptoBackend: Send + Sync {
    fn init(&self) {
        initialize();
    }

    /// Parse a private key from PEM text (no passphrase).
    fn read_private_pem(&self, pem: &[u8]) -> BackendResult<RsaObject>;

    /// Serialise a private key as PEM text into `out`.
    fn write_private_pem(&self, rsa: &RsaObject, out: &mut MemStream) -> BackendResult<()>;

    /// Parse a SubjectPublicKeyInfo PEM into its wrapper.
    fn read_public_pem(&self, pem: &[u8]) -> BackendResult<PublicKeyInfo>;

    /// Serialise the wrapped public key as PEM text into `out`.
    fn write_public_pem(&self, info: &PublicKeyInfo, out: &mut MemStream) -> BackendResult<()>;

    /// PKCS#1 v1.5 sign `digest` into `signature`, returning the length written.
    fn sign(
        &self,
        hash: HashType,
        digest: &[u8],
        signature: &mut [u8],
        rsa: &RsaObject,
    ) -> BackendResult<usize>;

    fn verify(
        &self,
        hash: HashType,
        digest: &[u8],
        signature: &[u8],
        rsa: &RsaObject,
    ) -> BackendResult<()>;

    fn generate(&self, bits: c_int, exponent: c_ulong) -> BackendResult<RsaObject>;
}

enum KeyMaterial {
    Private {
        key: RsaPrivateKey,
        public: RsaPublicKey,
    },
    Public(RsaPublicKey),
}

/// Reference-counted RSA key object. Cloning takes another share.
#[derive(Clone)]
pub struct RsaObject(Arc<KeyMaterial>);

impl RsaObject {
    pub fn from_private(key: RsaPrivateKey) -> Self {
        let public = key.to_public_key();
        Self(Arc::new(KeyMaterial::Private { key, public }))
    }

    pub fn from_public(key: RsaPublicKey) -> Self {
        Self(Arc::new(KeyMaterial::Public(key)))
    }

    pub fn private_key(&self) -> Option<&RsaPrivateKey> {
        match self.0.as_ref() {
            KeyMaterial::Private { key, .. } => Some(key),
            KeyMaterial::Public(_) => None,
        }
    }

    /// Public component, whichever kind of key this is.
    pub fn public_key(&self) -> &RsaPublicKey {
        match self.0.as_ref() {
            KeyMaterial::Private { public, .. } => public,
            KeyMaterial::Public(key) => key,
        }
    }

    pub fn is_private(&self) -> bool {
        self.private_key().is_some()
    }

    /// Modulus length in bytes, which is also the signature length.
    pub fn size(&self) -> usize {
        self.public_key().size()
    }

    pub fn bits(&self) -> usize {
        self.public_key().n().bits()
    }

    pub fn modulus(&self) -> &BigUint {
        self.public_key().n()
    }

    pub fn exponent(&self) -> &BigUint {
        self.public_key().e()
    }

    /// Number of live shares of the underlying key.
    pub fn share_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl fmt::Debug for RsaObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaObject")
            .field("bits", &self.bits())
            .field("private", &self.is_private())
            .finish()
    }
}

/// Generic public-key wrapper (SubjectPublicKeyInfo) around one key share.
#[derive(Debug)]
pub struct PublicKeyInfo {
    rsa: RsaObject,
}

impl PublicKeyInfo {
    /// Wrap `rsa`, taking over the share passed in.
    pub fn assign(rsa: RsaObject) -> Self {
        Self { rsa }
    }

    pub fn rsa(&self) -> &RsaObject {
        &self.rsa
    }

    /// Extract the RSA key with a share of its own, so it outlives the wrapper.
    pub fn get_rsa(&self) -> RsaObject {
        self.rsa.clone()
    }
}

/// In-memory serialisation target. Wiped on drop since it may carry private PEM.
pub struct MemStream {
    buf: Zeroizing<Vec<u8>>,
}

impl MemStream {
    pub fn new() -> Self {
        Self {
            buf: Zeroizing::new(Vec::new()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Append the single null byte that terminates PEM text.
    pub fn terminate(&mut self) -> io::Result<()> {
        self.write_all(&[0])
    }

    /// Copy the stream into `out` if it fits; otherwise report the size needed
    /// and leave `out` untouched.
    pub fn copy_out(&self, out: &mut [u8]) -> Result<usize> {
        let len = self.buf.len();
        if out.len() < len {
            return Err(KeyError::BufferTooSmall { required: len });
        }
        out[..len].copy_from_slice(&self.buf);
        Ok(len)
    }
}

impl Default for MemStream {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for MemStream {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
