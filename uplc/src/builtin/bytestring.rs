use rug::ops::RemRounding;

use super::Semantics;

pub fn append(mut x: Vec<u8>, y: Vec<u8>) -> Vec<u8> {
    x.extend(y);
    x
}

pub fn cons(semantics: Semantics, x: rug::Integer, mut y: Vec<u8>) -> Option<Vec<u8>> {
    let byte = match semantics {
        // Out-of-range head bytes fail before the Conway fork.
        Semantics::A => x.to_u8()?,
        Semantics::B => x.to_u8_wrapping(),
    };
    y.insert(0, byte);
    Some(y)
}

pub fn slice(start: rug::Integer, len: rug::Integer, bytes: Vec<u8>) -> Vec<u8> {
    let skip = start.to_usize().unwrap_or(if start.is_negative() { 0 } else { usize::MAX });
    let skip = skip.min(bytes.len());
    let take = len.to_usize().unwrap_or(if len.is_negative() { 0 } else { usize::MAX });
    bytes[skip..][..take.min(bytes.len() - skip)].to_vec()
}

pub fn length(bytes: Vec<u8>) -> rug::Integer {
    rug::Integer::from(bytes.len())
}

pub fn index(bytes: Vec<u8>, index: rug::Integer) -> Option<rug::Integer> {
    let index = index.to_usize()?;
    bytes.get(index).map(|byte| rug::Integer::from(*byte))
}

pub fn equals(x: Vec<u8>, y: Vec<u8>) -> bool {
    x == y
}

pub fn less_than(x: Vec<u8>, y: Vec<u8>) -> bool {
    x < y
}

pub fn less_than_or_equal(x: Vec<u8>, y: Vec<u8>) -> bool {
    x <= y
}

pub fn to_integer(big_endian: bool, bytes: Vec<u8>) -> rug::Integer {
    rug::Integer::from_digits(
        &bytes,
        if big_endian {
            rug::integer::Order::Msf
        } else {
            rug::integer::Order::Lsf
        },
    )
}

pub fn and(extend: bool, x: Vec<u8>, y: Vec<u8>) -> Vec<u8> {
    pointwise(extend, x, y, |a, b| a & b)
}

pub fn or(extend: bool, x: Vec<u8>, y: Vec<u8>) -> Vec<u8> {
    pointwise(extend, x, y, |a, b| a | b)
}

pub fn xor(extend: bool, x: Vec<u8>, y: Vec<u8>) -> Vec<u8> {
    pointwise(extend, x, y, |a, b| a ^ b)
}

/// With `extend`, the shorter operand is padded as if with the identity
/// byte of the operation; without, the longer is truncated.
fn pointwise(extend: bool, mut x: Vec<u8>, y: Vec<u8>, op: impl Fn(u8, u8) -> u8) -> Vec<u8> {
    x.iter_mut().zip(y.iter()).for_each(|(a, b)| *a = op(*a, *b));
    if extend && y.len() > x.len() {
        x.extend_from_slice(&y[x.len()..]);
    } else if !extend && x.len() > y.len() {
        x.truncate(y.len());
    }
    x
}

pub fn complement(mut x: Vec<u8>) -> Vec<u8> {
    x.iter_mut().for_each(|b| *b = !*b);
    x
}

/// Positive shifts move toward the most significant end; bits shifted out
/// are discarded and zeroes shifted in.
pub fn shift(x: Vec<u8>, by: rug::Integer) -> Vec<u8> {
    let len_bits = x.len() as i128 * 8;
    let Some(by) = by.to_i128() else {
        return vec![0; x.len()];
    };
    if by == 0 {
        return x;
    }
    if by.unsigned_abs() >= len_bits.unsigned_abs() {
        return vec![0; x.len()];
    }
    let mut out = vec![0u8; x.len()];
    for i in 0..len_bits {
        let source = i - by;
        if (0..len_bits).contains(&source) && bit_at(&x, source as usize) {
            set_bit(&mut out, i as usize);
        }
    }
    out
}

/// Positive rotations move toward the most significant end.
pub fn rotate(x: Vec<u8>, by: rug::Integer) -> Vec<u8> {
    if x.is_empty() {
        return x;
    }
    let len_bits = rug::Integer::from(x.len() * 8);
    let by = by.rem_euc(len_bits).to_usize().expect("reduced below the length");
    if by == 0 {
        return x;
    }
    let len = x.len() * 8;
    let mut out = vec![0u8; x.len()];
    for i in 0..len {
        if bit_at(&x, (i + len - by) % len) {
            set_bit(&mut out, i);
        }
    }
    out
}

pub fn count_set_bits(x: Vec<u8>) -> rug::Integer {
    let count: u32 = x.iter().map(|b| b.count_ones()).sum();
    rug::Integer::from(count)
}

pub fn first_set_bit(x: Vec<u8>) -> rug::Integer {
    let mut index = 0usize;
    for byte in x.iter().rev() {
        if byte.trailing_zeros() < 8 {
            return rug::Integer::from(index + byte.trailing_zeros() as usize);
        }
        index += 8;
    }
    rug::Integer::from(-1)
}

pub fn read_bit(x: Vec<u8>, index: rug::Integer) -> Option<bool> {
    let index = index.to_usize()?;
    if index >= x.len() * 8 {
        return None;
    }
    Some(bit_at(&x, index))
}

pub fn write_bits(mut x: Vec<u8>, indices: Vec<rug::Integer>, bit: bool) -> Option<Vec<u8>> {
    let len_bits = x.len() * 8;
    for index in indices {
        let index = index.to_usize()?;
        if index >= len_bits {
            return None;
        }
        let byte = x.len() - 1 - index / 8;
        if bit {
            x[byte] |= 1 << (index % 8);
        } else {
            x[byte] &= !(1 << (index % 8));
        }
    }
    Some(x)
}

pub fn replicate_byte(count: rug::Integer, byte: rug::Integer) -> Option<Vec<u8>> {
    let byte = byte.to_u8()?;
    let count = count.to_usize()?;
    if count > 8192 {
        return None;
    }
    Some(vec![byte; count])
}

/// Bit `0` is the least significant bit of the last byte.
fn bit_at(bytes: &[u8], index: usize) -> bool {
    let byte = bytes[bytes.len() - 1 - index / 8];
    byte & (1 << (index % 8)) != 0
}

fn set_bit(bytes: &mut [u8], index: usize) {
    let at = bytes.len() - 1 - index / 8;
    bytes[at] |= 1 << (index % 8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cons_semantics_split() {
        assert_eq!(
            cons(Semantics::A, 0x100.into(), vec![0xaa]),
            None
        );
        assert_eq!(
            cons(Semantics::B, 0x100.into(), vec![0xaa]),
            Some(vec![0x00, 0xaa])
        );
        assert_eq!(
            cons(Semantics::A, 0x41.into(), vec![]),
            Some(vec![0x41])
        );
    }

    #[test]
    fn slice_clamps() {
        let bytes = vec![1, 2, 3, 4];
        assert_eq!(slice(1.into(), 2.into(), bytes.clone()), vec![2, 3]);
        assert_eq!(slice((-5).into(), 2.into(), bytes.clone()), vec![1, 2]);
        assert_eq!(slice(3.into(), 100.into(), bytes.clone()), vec![4]);
        assert_eq!(slice(9.into(), 1.into(), bytes), Vec::<u8>::new());
    }

    #[test]
    fn bit_indexing_counts_from_the_little_end() {
        // 0x0001: bit 0 is set, bit 8 is not.
        assert_eq!(read_bit(vec![0x00, 0x01], 0.into()), Some(true));
        assert_eq!(read_bit(vec![0x00, 0x01], 8.into()), Some(false));
        assert_eq!(read_bit(vec![0x00, 0x01], 16.into()), None);
        assert_eq!(first_set_bit(vec![0x01, 0x00]), 8);
        assert_eq!(first_set_bit(vec![0x00]), -1);
    }

    #[test]
    fn shifts_and_rotations() {
        assert_eq!(shift(vec![0x00, 0x01], 1.into()), vec![0x00, 0x02]);
        assert_eq!(shift(vec![0x80, 0x00], 1.into()), vec![0x00, 0x00]);
        assert_eq!(shift(vec![0x00, 0x02], (-1).into()), vec![0x00, 0x01]);
        assert_eq!(shift(vec![0xff], 9.into()), vec![0x00]);

        assert_eq!(rotate(vec![0x80, 0x00], 1.into()), vec![0x00, 0x01]);
        assert_eq!(rotate(vec![0x00, 0x01], (-1).into()), vec![0x80, 0x00]);
        assert_eq!(rotate(vec![0xab], 16.into()), vec![0xab]);
    }

    #[test]
    fn write_bits_rejects_out_of_range() {
        assert_eq!(
            write_bits(vec![0x00], vec![0.into(), 7.into()], true),
            Some(vec![0x81])
        );
        assert_eq!(write_bits(vec![0x00], vec![8.into()], true), None);
    }
}
