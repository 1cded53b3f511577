use k256::{
    ecdsa::{self, signature::hazmat::PrehashVerifier},
    schnorr,
};

pub fn verify_ecdsa(verifying_key: Vec<u8>, message: Vec<u8>, signature: Vec<u8>) -> Option<bool> {
    if message.len() != 32 {
        return None;
    }

    let verifying_key = ecdsa::VerifyingKey::from_sec1_bytes(&verifying_key).ok()?;
    let signature = ecdsa::Signature::from_slice(&signature).ok()?;
    Some(verifying_key.verify_prehash(&message, &signature).is_ok())
}

pub fn verify_schnorr(
    verifying_key: Vec<u8>,
    message: Vec<u8>,
    signature: Vec<u8>,
) -> Option<bool> {
    let verifying_key = schnorr::VerifyingKey::from_bytes(&verifying_key).ok()?;
    let signature_bytes: &[u8] = &signature;
    let Ok(signature) = schnorr::Signature::try_from(signature_bytes) else {
        return Some(false);
    };
    Some(
        verifying_key
            .verify_prehash(&message, &signature)
            .is_ok(),
    )
}
