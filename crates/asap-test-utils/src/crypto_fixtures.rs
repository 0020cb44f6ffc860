//! Fixed key pairs for testing
//!
//! Keys are checked in under `fixtures/` so signatures are reproducible and
//! no key generation happens at test time. Never use these outside tests.

use jsonwebtoken::{Algorithm, EncodingKey};

/// A signing key pair with the algorithm it is used with.
#[derive(Debug, Clone, Copy)]
pub struct TestKeyPair {
    /// Short key name, used as the last key id segment.
    pub name: &'static str,
    pub alg: Algorithm,
    /// PKCS#8 PEM private key.
    pub private_pem: &'static str,
    /// SPKI PEM public key, as a key repository would serve it.
    pub public_pem: &'static str,
}

impl TestKeyPair {
    /// Key id namespaced under `issuer`, e.g. `svc-a/rsa-primary`.
    pub fn key_id(&self, issuer: &str) -> String {
        format!("{issuer}/{}", self.name)
    }

    /// Encoding key for signing tokens with this pair.
    ///
    /// # Panics
    ///
    /// Panics if the checked-in PEM is unreadable.
    pub fn encoding_key(&self) -> EncodingKey {
        let pem = self.private_pem.as_bytes();
        match self.alg {
            Algorithm::ES256 | Algorithm::ES384 => {
                EncodingKey::from_ec_pem(pem).expect("fixture EC key must parse")
            }
            _ => EncodingKey::from_rsa_pem(pem).expect("fixture RSA key must parse"),
        }
    }
}

/// Primary RSA-2048 key, signed with RS256.
pub const RSA_PRIMARY: TestKeyPair = TestKeyPair {
    name: "rsa-primary",
    alg: Algorithm::RS256,
    private_pem: include_str!("../fixtures/rsa_primary.pem"),
    public_pem: include_str!("../fixtures/rsa_primary.pub.pem"),
};

/// Second, unrelated RSA-2048 key. Useful for signature mismatch tests.
pub const RSA_OTHER: TestKeyPair = TestKeyPair {
    name: "rsa-other",
    alg: Algorithm::RS256,
    private_pem: include_str!("../fixtures/rsa_other.pem"),
    public_pem: include_str!("../fixtures/rsa_other.pub.pem"),
};

/// P-256 key, signed with ES256.
pub const EC_P256: TestKeyPair = TestKeyPair {
    name: "ec-p256",
    alg: Algorithm::ES256,
    private_pem: include_str!("../fixtures/ec_p256.pem"),
    public_pem: include_str!("../fixtures/ec_p256.pub.pem"),
};
