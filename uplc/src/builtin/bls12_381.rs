use bls12_381::{
    G1Affine, G1Projective, G2Affine, G2Prepared, G2Projective, MillerLoopResult, Scalar,
    hash_to_curve::{ExpandMsgXmd, HashToCurve},
    multi_miller_loop,
};
use rug::ops::RemRounding;

/// The order of both groups:
/// `q = 0x73eda753299d7d483339d80809a1d80553bda402fffe5bfeffffffff00000001`.
const SCALAR_MODULUS: [u64; 4] = [
    0xffff_ffff_0000_0001,
    0x53bd_a402_fffe_5bfe,
    0x3339_d808_09a1_d805,
    0x73ed_a753_299d_7d48,
];

/// Domain separation tags are limited to 255 bytes by the ciphersuite.
const MAX_DST_LENGTH: usize = 255;

fn scalar(value: rug::Integer) -> Scalar {
    let reduced = value.rem_floor(rug::Integer::from_digits(
        &SCALAR_MODULUS,
        rug::integer::Order::Lsf,
    ));
    let mut bytes = [0u8; 32];
    reduced.write_digits(&mut bytes, rug::integer::Order::Lsf);
    Option::from(Scalar::from_bytes(&bytes)).expect("the value was reduced below the modulus")
}

pub fn g1_add(p: G1Projective, q: G1Projective) -> G1Projective {
    p + q
}

pub fn g1_neg(p: G1Projective) -> G1Projective {
    -p
}

pub fn g1_scalar_mul(k: rug::Integer, p: G1Projective) -> G1Projective {
    p * scalar(k)
}

pub fn g1_equals(p: G1Projective, q: G1Projective) -> bool {
    p == q
}

pub fn g1_compress(p: G1Projective) -> Vec<u8> {
    G1Affine::from(&p).to_compressed().to_vec()
}

pub fn g1_uncompress(bytes: Vec<u8>) -> Option<G1Projective> {
    let compressed: [u8; 48] = bytes.try_into().ok()?;
    Option::<G1Affine>::from(G1Affine::from_compressed(&compressed)).map(G1Projective::from)
}

pub fn g1_hash_to_group(message: Vec<u8>, dst: Vec<u8>) -> Option<G1Projective> {
    if dst.len() > MAX_DST_LENGTH {
        return None;
    }
    Some(<G1Projective as HashToCurve<ExpandMsgXmd<sha2_0_9::Sha256>>>::hash_to_curve(
        &message, &dst,
    ))
}

pub fn g2_add(p: G2Projective, q: G2Projective) -> G2Projective {
    p + q
}

pub fn g2_neg(p: G2Projective) -> G2Projective {
    -p
}

pub fn g2_scalar_mul(k: rug::Integer, p: G2Projective) -> G2Projective {
    p * scalar(k)
}

pub fn g2_equals(p: G2Projective, q: G2Projective) -> bool {
    p == q
}

pub fn g2_compress(p: G2Projective) -> Vec<u8> {
    G2Affine::from(&p).to_compressed().to_vec()
}

pub fn g2_uncompress(bytes: Vec<u8>) -> Option<G2Projective> {
    let compressed: [u8; 96] = bytes.try_into().ok()?;
    Option::<G2Affine>::from(G2Affine::from_compressed(&compressed)).map(G2Projective::from)
}

pub fn g2_hash_to_group(message: Vec<u8>, dst: Vec<u8>) -> Option<G2Projective> {
    if dst.len() > MAX_DST_LENGTH {
        return None;
    }
    Some(<G2Projective as HashToCurve<ExpandMsgXmd<sha2_0_9::Sha256>>>::hash_to_curve(
        &message, &dst,
    ))
}

pub fn miller_loop(p: G1Projective, q: G2Projective) -> MillerLoopResult {
    let p = G1Affine::from(&p);
    let q = G2Prepared::from(G2Affine::from(&q));
    multi_miller_loop(&[(&p, &q)])
}

pub fn mul_ml_result(a: MillerLoopResult, b: MillerLoopResult) -> MillerLoopResult {
    a + b
}

pub fn final_verify(a: MillerLoopResult, b: MillerLoopResult) -> bool {
    a.final_exponentiation() == b.final_exponentiation()
}

#[cfg(test)]
mod tests {
    use super::*;
    use group::Group;

    #[test]
    fn compression_roundtrip() {
        let p = G1Projective::generator();
        let bytes = g1_compress(p);
        assert_eq!(bytes.len(), 48);
        assert_eq!(g1_uncompress(bytes), Some(p));
        assert_eq!(g1_uncompress(vec![0; 47]), None);

        let q = G2Projective::generator();
        let bytes = g2_compress(q);
        assert_eq!(bytes.len(), 96);
        assert_eq!(g2_uncompress(bytes), Some(q));
    }

    #[test]
    fn scalars_reduce_modulo_the_group_order() {
        let p = G1Projective::generator();
        let order = rug::Integer::from_digits(&SCALAR_MODULUS, rug::integer::Order::Lsf);
        assert_eq!(g1_scalar_mul(order.clone() + 5, p), g1_scalar_mul(5.into(), p));
        assert_eq!(g1_scalar_mul((-1i8).into(), p), g1_scalar_mul(order - 1u8, p));
    }

    #[test]
    fn pairing_is_bilinear() {
        let p = G1Projective::generator();
        let q = G2Projective::generator();
        // e(2P, Q) == e(P, Q) * e(P, Q)
        let double = miller_loop(g1_scalar_mul(2.into(), p), q);
        let single = miller_loop(p, q);
        assert!(final_verify(double, mul_ml_result(single, single)));
        assert!(!final_verify(double, single));
    }

    #[test]
    fn hash_to_group_rejects_long_tags() {
        assert!(g1_hash_to_group(vec![1, 2, 3], vec![0; 256]).is_none());
        let a = g1_hash_to_group(b"msg".to_vec(), b"tag".to_vec()).unwrap();
        let b = g1_hash_to_group(b"msg".to_vec(), b"tag".to_vec()).unwrap();
        assert_eq!(a, b);
    }
}
