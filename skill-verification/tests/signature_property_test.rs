use base64::{engine::general_purpose::STANDARD, Engine};
use proptest::prelude::*;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use sha1::Sha1;
use skill_verification::{check_signature, Certificate};
use std::sync::OnceLock;

const PROVIDER_KEY: &str = include_str!("fixtures/provider_key.pem");
const PROVIDER_CERT: &str = include_str!("fixtures/provider_cert.pem");

fn signing_key() -> &'static SigningKey<Sha1> {
    static KEY: OnceLock<SigningKey<Sha1>> = OnceLock::new();
    KEY.get_or_init(|| SigningKey::new(RsaPrivateKey::from_pkcs8_pem(PROVIDER_KEY).unwrap()))
}

fn certificate() -> &'static Certificate {
    static CERT: OnceLock<Certificate> = OnceLock::new();
    CERT.get_or_init(|| Certificate::from_pem(PROVIDER_CERT.as_bytes()).unwrap())
}

proptest! {
    // RSA signing is slow in debug builds
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_signature_verifies_and_any_bit_flip_breaks_it(
        payload in proptest::collection::vec(any::<u8>(), 1..512),
        bit in any::<prop::sample::Index>(),
    ) {
        let signature = STANDARD.encode(signing_key().sign(&payload).to_bytes());
        prop_assert!(check_signature(&payload, &signature, certificate()));

        let position = bit.index(payload.len() * 8);
        let mut mutated = payload.clone();
        mutated[position / 8] ^= 1 << (position % 8);
        prop_assert!(!check_signature(&mutated, &signature, certificate()));
    }

    #[test]
    fn prop_arbitrary_signature_text_never_panics(text in ".{0,64}") {
        prop_assert!(!check_signature(b"payload", &text, certificate()));
    }
}
