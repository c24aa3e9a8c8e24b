//! RSA key management over opaque handles.
//!
//! [`RsaKey`] is a small fixed-size handle owning one RSA key. A
//! [`KeyManager`] imports keys from PEM, exports them back, signs and verifies
//! digests under PKCS#1 v1.5, and generates key pairs. Output buffers follow a
//! two-phase protocol: call with too little room and the error carries the
//! size to retry with.
//!
//! ```no_run
//! use rsakeys::{HashType, KeyManager, RsaKey, DEFAULT_EXPONENT};
//!
//! # fn main() -> rsakeys::Result<()> {
//! let manager = KeyManager::new();
//! let mut private = RsaKey::new();
//! let mut public = RsaKey::new();
//! manager.generate_key_pair(2048, DEFAULT_EXPONENT, &mut private, &mut public)?;
//!
//! let digest = HashType::Sha256.digest(b"message");
//! let signature = manager.sign_to_vec(&private, HashType::Sha256, &digest)?;
//! manager.verify(&public, HashType::Sha256, &digest, &signature)?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
mod error;
mod generate;
mod hash;
mod key;
mod manager;
mod params;
mod pem;
pub mod rustcrypto;
mod sign;

pub use backend::{initialize, is_initialized, CryptoBackend};
pub use error::{KeyError, Result};
pub use generate::DEFAULT_EXPONENT;
pub use hash::HashType;
pub use key::RsaKey;
pub use manager::{negotiate, KeyManager};
pub use rustcrypto::RustCryptoBackend;
