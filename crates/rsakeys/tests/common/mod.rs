#![allow(dead_code)]

use std::ffi::{c_int, c_ulong};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use rsakeys::backend::{BackendError, BackendResult, MemStream, PublicKeyInfo, RsaObject};
use rsakeys::{CryptoBackend, HashType, KeyManager, RsaKey, RustCryptoBackend, DEFAULT_EXPONENT};

pub const TEST_BITS: u64 = 1024;

/// Fixture file from tests/data, null-terminated the way the key manager expects.
pub fn pem_fixture(name: &str) -> Vec<u8> {
    let path = format!("{}/tests/data/{}", env!("CARGO_MANIFEST_DIR"), name);
    let mut data = std::fs::read(&path).unwrap_or_else(|e| panic!("read {path}: {e}"));
    data.push(0);
    data
}

pub fn text_fixture(name: &str) -> String {
    let path = format!("{}/tests/data/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("read {path}: {e}"))
}

pub fn import_private(manager: &KeyManager, pem: &[u8]) -> RsaKey {
    let mut key = RsaKey::new();
    manager.import_private_key(pem, &mut key).unwrap();
    key
}

pub fn import_public(manager: &KeyManager, pem: &[u8]) -> RsaKey {
    let mut key = RsaKey::new();
    manager.import_public_key(pem, &mut key).unwrap();
    key
}

/// PEM pair generated once per test binary: (private, public).
pub fn generated_pair() -> &'static (Vec<u8>, Vec<u8>) {
    static PAIR: OnceLock<(Vec<u8>, Vec<u8>)> = OnceLock::new();
    PAIR.get_or_init(|| {
        let manager = KeyManager::new();
        let mut private = RsaKey::new();
        let mut public = RsaKey::new();
        manager
            .generate_key_pair(TEST_BITS, DEFAULT_EXPONENT, &mut private, &mut public)
            .unwrap();
        (
            manager.export_private_key_to_vec(&private).unwrap().to_vec(),
            manager.export_public_key_to_vec(&public).unwrap(),
        )
    })
}

/// Backend that counts calls and can be told to misbehave.
#[derive(Default)]
pub struct ProbeBackend {
    inner: RustCryptoBackend,
    calls: AtomicUsize,
    fail_public_write: bool,
    short_signature: bool,
}

impl ProbeBackend {
    pub fn failing_public_write() -> Self {
        Self {
            fail_public_write: true,
            ..Self::default()
        }
    }

    pub fn with_short_signature() -> Self {
        Self {
            short_signature: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl CryptoBackend for ProbeBackend {
    fn init(&self) {
        self.hit();
        self.inner.init();
    }

    fn read_private_pem(&self, pem: &[u8]) -> BackendResult<RsaObject> {
        self.hit();
        self.inner.read_private_pem(pem)
    }

    fn write_private_pem(&self, rsa: &RsaObject, out: &mut MemStream) -> BackendResult<()> {
        self.hit();
        self.inner.write_private_pem(rsa, out)
    }

    fn read_public_pem(&self, pem: &[u8]) -> BackendResult<PublicKeyInfo> {
        self.hit();
        self.inner.read_public_pem(pem)
    }

    fn write_public_pem(&self, info: &PublicKeyInfo, out: &mut MemStream) -> BackendResult<()> {
        self.hit();
        if self.fail_public_write {
            return Err(BackendError::Encode("public key writer disabled".into()));
        }
        self.inner.write_public_pem(info, out)
    }

    fn sign(
        &self,
        hash: HashType,
        digest: &[u8],
        signature: &mut [u8],
        rsa: &RsaObject,
    ) -> BackendResult<usize> {
        self.hit();
        let written = self.inner.sign(hash, digest, signature, rsa)?;
        if self.short_signature {
            return Ok(written - 1);
        }
        Ok(written)
    }

    fn verify(
        &self,
        hash: HashType,
        digest: &[u8],
        signature: &[u8],
        rsa: &RsaObject,
    ) -> BackendResult<()> {
        self.hit();
        self.inner.verify(hash, digest, signature, rsa)
    }

    fn generate(&self, bits: c_int, exponent: c_ulong) -> BackendResult<RsaObject> {
        self.hit();
        self.inner.generate(bits, exponent)
    }
}
