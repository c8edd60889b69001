use std::sync::OnceLock;

use gostcert::cert::AlgorithmSuite;
use gostcert::cert::extensions::SubjectKeyIdentifier;
use gostcert::cert::params::{AttributeKey, SubjectFields, SubjectIdentity};
use gostcert::key::KeyPair;
use gostcert::pki;
use proptest::prelude::*;

/// One key pair shared by every case; generation is the slow part.
fn shared_key() -> &'static KeyPair {
    static KEY: OnceLock<KeyPair> = OnceLock::new();
    KEY.get_or_init(|| KeyPair::generate(AlgorithmSuite::default().params()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn signature_round_trips(message in proptest::collection::vec(any::<u8>(), 0..256)) {
        let suite = AlgorithmSuite::default();
        let key = shared_key();
        let signature = pki::sign(&message, key.private_key(), &suite).unwrap();
        prop_assert_eq!(signature.len(), 64);
        prop_assert!(pki::verify(&message, &signature, key.public_key(), &suite).unwrap());
    }

    #[test]
    fn flipped_signature_bit_fails(
        message in proptest::collection::vec(any::<u8>(), 1..64),
        bit in 0usize..512,
    ) {
        let suite = AlgorithmSuite::default();
        let key = shared_key();
        let mut signature = pki::sign(&message, key.private_key(), &suite).unwrap();
        signature[bit / 8] ^= 1 << (bit % 8);
        prop_assert!(!pki::verify(&message, &signature, key.public_key(), &suite).unwrap());
    }

    #[test]
    fn flipped_message_bit_fails(
        message in proptest::collection::vec(any::<u8>(), 1..64),
        index in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let suite = AlgorithmSuite::default();
        let key = shared_key();
        let signature = pki::sign(&message, key.private_key(), &suite).unwrap();
        let mut tampered = message.clone();
        tampered[index.index(message.len())] ^= 1 << bit;
        prop_assert!(!pki::verify(&tampered, &signature, key.public_key(), &suite).unwrap());
    }

    #[test]
    fn reordering_changes_encoding(
        org in "[A-Za-z ]{1,16}",
        cn in "[A-Za-z ]{1,16}",
    ) {
        let fields = SubjectFields::builder()
            .country("RU".to_string())
            .organization(org)
            .common_name(cn)
            .build();
        let forward = SubjectIdentity::build(
            &fields,
            &[],
            &[AttributeKey::Country, AttributeKey::Organization, AttributeKey::CommonName],
        )
        .unwrap();
        let reversed = SubjectIdentity::build(
            &fields,
            &[],
            &[AttributeKey::CommonName, AttributeKey::Organization, AttributeKey::Country],
        )
        .unwrap();
        prop_assert_ne!(forward.to_der().unwrap(), reversed.to_der().unwrap());
    }
}

#[test]
fn subject_key_identifier_is_stable_for_same_key() {
    let key = shared_key();
    let first = SubjectKeyIdentifier::from_public_key(key.public_key()).unwrap();
    let second = SubjectKeyIdentifier::from_public_key(&key.public_key().clone()).unwrap();
    assert_eq!(first, second);
}
