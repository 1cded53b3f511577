use digest::Digest;

pub fn digest<D: Digest>(data: Vec<u8>) -> Vec<u8> {
    let mut hasher = D::new();
    hasher.update(&data);
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    #[test]
    fn empty_input_digests() {
        assert_eq!(
            const_hex::encode(super::digest::<sha2::Sha256>(vec![])),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            super::digest::<blake2::Blake2b<blake2::digest::consts::U28>>(vec![]).len(),
            28
        );
        assert_eq!(super::digest::<sha3::Keccak256>(vec![]).len(), 32);
    }
}
