use ed25519_dalek::{Signature, Verifier, VerifyingKey};

pub fn verify(public_key: Vec<u8>, message: Vec<u8>, signature: Vec<u8>) -> Option<bool> {
    let array_bytes: [u8; 32] = public_key.as_slice().try_into().ok()?;
    let Ok(public_key) = VerifyingKey::from_bytes(&array_bytes) else {
        return Some(false);
    };
    let signature = Signature::from_slice(&signature).ok()?;
    Some(public_key.verify(&message, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_requirements() {
        assert_eq!(verify(vec![0; 31], vec![], vec![0; 64]), None);
        assert_eq!(verify(vec![0; 32], vec![], vec![0; 63]), None);
    }

    #[test]
    fn wrong_signature_is_false_not_an_error() {
        assert_eq!(verify(vec![1; 32], b"msg".to_vec(), vec![0; 64]), Some(false));
    }
}
