//! COSE public key parsing and assertion signature verification.
//!
//! Credentials attest their public key as a COSE_Key CBOR map. Two
//! algorithms are accepted, fail closed on anything else:
//!
//! - ES256 (alg -7): EC2 key on P-256, ASN.1 DER signatures
//! - EdDSA (alg -8): OKP key on Ed25519, raw 64-byte signatures

use ciborium::value::Value;
use p256::ecdsa::signature::Verifier as _;

use crate::error::CeremonyError;

/// COSE algorithm identifier for ES256.
pub const ALG_ES256: i64 = -7;

/// COSE algorithm identifier for EdDSA.
pub const ALG_EDDSA: i64 = -8;

// COSE_Key map labels
const LABEL_KTY: i64 = 1;
const LABEL_ALG: i64 = 3;
const LABEL_CRV: i64 = -1;
const LABEL_X: i64 = -2;
const LABEL_Y: i64 = -3;

// Key types and curves
const KTY_OKP: i64 = 1;
const KTY_EC2: i64 = 2;
const CRV_P256: i64 = 1;
const CRV_ED25519: i64 = 6;

/// A parsed, verification-ready COSE public key.
#[derive(Debug, Clone)]
pub enum CosePublicKey {
    /// ES256 / P-256 ECDSA.
    Es256(p256::ecdsa::VerifyingKey),
    /// EdDSA / Ed25519.
    Ed25519(ed25519_dalek::VerifyingKey),
}

impl CosePublicKey {
    /// Parse raw COSE_Key bytes into a verification key.
    ///
    /// Fails closed on unknown key types, algorithms, curves, or malformed
    /// coordinates.
    pub fn parse(raw: &[u8]) -> Result<Self, CeremonyError> {
        let value: Value = ciborium::de::from_reader(raw)
            .map_err(|err| CeremonyError::verification(format!("COSE key CBOR: {err}")))?;
        let Value::Map(entries) = value else {
            return Err(CeremonyError::verification("COSE key is not a map"));
        };

        let kty = int_entry(&entries, LABEL_KTY)
            .ok_or_else(|| CeremonyError::verification("COSE key missing kty"))?;
        let alg = int_entry(&entries, LABEL_ALG)
            .ok_or_else(|| CeremonyError::verification("COSE key missing alg"))?;
        let crv = int_entry(&entries, LABEL_CRV)
            .ok_or_else(|| CeremonyError::verification("COSE key missing crv"))?;

        match (kty, alg, crv) {
            (KTY_EC2, ALG_ES256, CRV_P256) => {
                let x = bytes_entry(&entries, LABEL_X)
                    .ok_or_else(|| CeremonyError::verification("EC2 key missing x"))?;
                let y = bytes_entry(&entries, LABEL_Y)
                    .ok_or_else(|| CeremonyError::verification("EC2 key missing y"))?;
                if x.len() != 32 || y.len() != 32 {
                    return Err(CeremonyError::verification("EC2 coordinate length"));
                }
                // Uncompressed SEC1 point: 0x04 || x || y
                let mut sec1 = Vec::with_capacity(65);
                sec1.push(0x04);
                sec1.extend_from_slice(x);
                sec1.extend_from_slice(y);
                let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                    .map_err(|_| CeremonyError::verification("EC2 point not on curve"))?;
                Ok(Self::Es256(key))
            },
            (KTY_OKP, ALG_EDDSA, CRV_ED25519) => {
                let x = bytes_entry(&entries, LABEL_X)
                    .ok_or_else(|| CeremonyError::verification("OKP key missing x"))?;
                let exact: [u8; 32] = x
                    .try_into()
                    .map_err(|_| CeremonyError::verification("OKP coordinate length"))?;
                let key = ed25519_dalek::VerifyingKey::from_bytes(&exact)
                    .map_err(|_| CeremonyError::verification("invalid Ed25519 point"))?;
                Ok(Self::Ed25519(key))
            },
            (kty, alg, crv) => Err(CeremonyError::verification(format!(
                "unsupported COSE key: kty {kty}, alg {alg}, crv {crv}"
            ))),
        }
    }

    /// Verify an assertion signature over `message`.
    ///
    /// ES256 signatures arrive ASN.1 DER encoded; Ed25519 as raw 64 bytes.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), CeremonyError> {
        match self {
            Self::Es256(key) => {
                let sig = p256::ecdsa::Signature::from_der(signature)
                    .map_err(|_| CeremonyError::verification("ES256 signature encoding"))?;
                key.verify(message, &sig)
                    .map_err(|_| CeremonyError::verification("ES256 signature invalid"))
            },
            Self::Ed25519(key) => {
                let sig = ed25519_dalek::Signature::from_slice(signature)
                    .map_err(|_| CeremonyError::verification("Ed25519 signature encoding"))?;
                key.verify(message, &sig)
                    .map_err(|_| CeremonyError::verification("Ed25519 signature invalid"))
            },
        }
    }
}

fn int_entry(entries: &[(Value, Value)], label: i64) -> Option<i64> {
    entries.iter().find_map(|(key, value)| match (key, value) {
        (Value::Integer(k), Value::Integer(v)) if i128::from(*k) == i128::from(label) => {
            i64::try_from(i128::from(*v)).ok()
        },
        _ => None,
    })
}

fn bytes_entry<'a>(entries: &'a [(Value, Value)], label: i64) -> Option<&'a [u8]> {
    entries.iter().find_map(|(key, value)| match (key, value) {
        (Value::Integer(k), Value::Bytes(v)) if i128::from(*k) == i128::from(label) => {
            Some(v.as_slice())
        },
        _ => None,
    })
}

/// Encode an Ed25519 public key as COSE_Key bytes.
///
/// Shared with the simulation harness, which attests keys the same way a
/// real authenticator would.
pub fn encode_ed25519(public_key: &ed25519_dalek::VerifyingKey) -> Vec<u8> {
    let map = Value::Map(vec![
        (Value::Integer(LABEL_KTY.into()), Value::Integer(KTY_OKP.into())),
        (Value::Integer(LABEL_ALG.into()), Value::Integer(ALG_EDDSA.into())),
        (Value::Integer(LABEL_CRV.into()), Value::Integer(CRV_ED25519.into())),
        (Value::Integer(LABEL_X.into()), Value::Bytes(public_key.to_bytes().to_vec())),
    ]);
    let mut out = Vec::new();
    let Ok(()) = ciborium::ser::into_writer(&map, &mut out) else {
        unreachable!("CBOR serialization to a Vec cannot fail");
    };
    out
}
