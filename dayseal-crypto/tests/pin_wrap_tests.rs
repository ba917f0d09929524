use dayseal_crypto::{CryptoError, Identity, PinSealed, is_valid_secret, seal, unseal};

#[test]
fn seal_unseal_roundtrip() {
    let secret = Identity::generate().secret_encoding().unwrap();
    let sealed = seal(&secret, "1234").unwrap();
    let recovered = unseal(&sealed.ciphertext, "1234", &sealed.salt, &sealed.iv).unwrap();
    assert_eq!(recovered.as_str(), secret.as_str());
}

#[test]
fn wrong_pin_fails_authentication() {
    let secret = Identity::generate().secret_encoding().unwrap();
    let sealed = seal(&secret, "1234").unwrap();
    let result = unseal(&sealed.ciphertext, "9999", &sealed.salt, &sealed.iv);
    assert_eq!(result, Err(CryptoError::Authentication));
}

#[test]
fn each_seal_uses_fresh_salt_and_iv() {
    let a = seal("same secret", "1234").unwrap();
    let b = seal("same secret", "1234").unwrap();
    assert_ne!(a.salt, b.salt);
    assert_ne!(a.iv, b.iv);
    assert_ne!(a.ciphertext, b.ciphertext);
}

#[test]
fn salt_from_another_seal_fails() {
    let a = seal("secret", "1234").unwrap();
    let b = seal("secret", "1234").unwrap();
    let result = unseal(&a.ciphertext, "1234", &b.salt, &a.iv);
    assert_eq!(result, Err(CryptoError::Authentication));
}

#[test]
fn tampered_ciphertext_fails_authentication() {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    let sealed = seal("secret", "1234").unwrap();
    let mut bytes = STANDARD.decode(&sealed.ciphertext).unwrap();
    bytes[0] ^= 0x01;
    let tampered = STANDARD.encode(bytes);

    let result = unseal(&tampered, "1234", &sealed.salt, &sealed.iv);
    assert_eq!(result, Err(CryptoError::Authentication));
}

#[test]
fn sealed_serializes_with_plain_field_names() {
    let sealed = seal("secret", "1234").unwrap();
    let json = serde_json::to_value(&sealed).unwrap();
    assert!(json.get("ciphertext").is_some());
    assert!(json.get("salt").is_some());
    assert!(json.get("iv").is_some());

    let back: PinSealed = serde_json::from_value(json).unwrap();
    assert_eq!(back.unseal("1234").unwrap().as_str(), "secret");
}

#[test]
fn empty_pin_still_round_trips() {
    // PIN policy is enforced by the session, not the key-wrap.
    let sealed = seal("secret", "").unwrap();
    assert_eq!(sealed.unseal("").unwrap().as_str(), "secret");
}

// Property-based tests. PBKDF2 runs 100k rounds per call, so keep the case
// count small.
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(4))]

        #[test]
        fn wrapped_secret_always_roundtrips(pin in "[0-9]{4,8}") {
            let secret = Identity::generate().secret_encoding().unwrap();
            let sealed = seal(&secret, &pin).unwrap();
            let recovered = sealed.unseal(&pin).unwrap();
            prop_assert_eq!(recovered.as_str(), secret.as_str());
            prop_assert!(is_valid_secret(&recovered));
        }

        #[test]
        fn wrong_pin_never_unseals(pin in "[0-9]{4,8}", other in "[0-9]{4,8}") {
            prop_assume!(pin != other);
            let secret = Identity::generate().secret_encoding().unwrap();
            let sealed = seal(&secret, &pin).unwrap();
            prop_assert_eq!(sealed.unseal(&other), Err(CryptoError::Authentication));
        }
    }
}
