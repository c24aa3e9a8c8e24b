mod common;

use common::{import_private, pem_fixture, ProbeBackend, TEST_BITS};
use rsakeys::{HashType, KeyError, KeyManager, RsaKey, DEFAULT_EXPONENT};

fn invalid(result: rsakeys::Result<impl std::fmt::Debug>) {
    match result {
        Err(KeyError::InvalidParameter(_)) => {}
        other => panic!("expected InvalidParameter, got {other:?}"),
    }
}

#[test]
fn freed_handle_is_rejected_without_touching_backend() {
    let manager = KeyManager::with_backend(ProbeBackend::default());
    let mut key = RsaKey::new();
    manager
        .import_private_key(&pem_fixture("priv_pkcs1.pem"), &mut key)
        .unwrap();
    key.free().unwrap();
    assert!(!key.is_valid());

    let before = manager.backend().calls();
    let digest = HashType::Sha256.digest(b"freed");
    let mut buf = vec![0u8; 4096];

    invalid(key.free());
    invalid(manager.export_private_key(&key, &mut buf));
    invalid(manager.export_public_key(&key, &mut buf));
    invalid(manager.sign(&key, HashType::Sha256, &digest, &mut buf));
    invalid(manager.verify(&key, HashType::Sha256, &digest, &buf[..128]));
    invalid(manager.signature_size(&key));
    invalid(manager.modulus(&key, &mut buf));

    assert_eq!(manager.backend().calls(), before);
}

#[test]
fn never_valid_handle_is_rejected_without_touching_backend() {
    let manager = KeyManager::with_backend(ProbeBackend::default());
    let mut key = RsaKey::default();
    let mut buf = vec![0u8; 256];

    invalid(key.free());
    invalid(manager.export_public_key(&key, &mut buf));
    invalid(manager.sign(&key, HashType::Sha512, &[1; 64], &mut buf));

    invalid(manager.import_private_key(b"", &mut key));
    invalid(manager.import_public_key(b"-----BEGIN", &mut key));

    assert_eq!(manager.backend().calls(), 0);
}

#[test]
fn freed_handle_can_be_reused() {
    let manager = KeyManager::new();
    let mut key = import_private(&manager, &pem_fixture("priv_pkcs1.pem"));
    key.free().unwrap();

    manager
        .import_public_key(&pem_fixture("pub.pem"), &mut key)
        .unwrap();
    assert!(key.is_valid());
    assert_eq!(manager.signature_size(&key).unwrap(), 128);
    key.free().unwrap();
}

#[test]
fn failed_generation_leaves_both_handles_empty() {
    let manager = KeyManager::with_backend(ProbeBackend::failing_public_write());
    let mut private = RsaKey::new();
    let mut public = RsaKey::new();

    let err = manager
        .generate_key_pair(TEST_BITS, DEFAULT_EXPONENT, &mut private, &mut public)
        .unwrap_err();
    assert!(matches!(err, KeyError::Failure(_)), "got {err:?}");
    assert!(!private.is_valid());
    assert!(!public.is_valid());
}

#[test]
fn failed_generation_empties_previously_valid_handles() {
    let manager = KeyManager::with_backend(ProbeBackend::failing_public_write());
    let mut private = RsaKey::new();
    let mut public = RsaKey::new();
    manager
        .import_private_key(&pem_fixture("priv_pkcs1.pem"), &mut private)
        .unwrap();
    manager
        .import_public_key(&pem_fixture("pub.pem"), &mut public)
        .unwrap();

    assert!(manager
        .generate_key_pair(TEST_BITS, DEFAULT_EXPONENT, &mut private, &mut public)
        .is_err());
    assert!(!private.is_valid());
    assert!(!public.is_valid());
}

#[test]
fn short_backend_signature_is_unexpected() {
    let manager = KeyManager::with_backend(ProbeBackend::with_short_signature());
    let mut key = RsaKey::new();
    manager
        .import_private_key(&pem_fixture("priv_pkcs1.pem"), &mut key)
        .unwrap();

    let digest = HashType::Sha256.digest(b"short");
    let mut sig = vec![0u8; 128];
    assert!(matches!(
        manager.sign(&key, HashType::Sha256, &digest, &mut sig),
        Err(KeyError::Unexpected(_))
    ));
}

#[test]
fn generated_handles_are_independent() {
    let manager = KeyManager::new();
    let mut private = RsaKey::new();
    let mut public = RsaKey::new();
    manager
        .generate_key_pair(TEST_BITS, DEFAULT_EXPONENT, &mut private, &mut public)
        .unwrap();
    assert!(manager.public_keys_equal(&private, &public).unwrap());

    private.free().unwrap();

    let digest = HashType::Sha256.digest(b"still here");
    let mut sig = vec![0u8; 128];
    invalid(manager.sign(&private, HashType::Sha256, &digest, &mut sig));
    assert_eq!(manager.signature_size(&public).unwrap(), 128);
    assert_eq!(
        manager.exponent(&public, &mut sig).unwrap(),
        3,
        "65537 encodes in three bytes"
    );
}
