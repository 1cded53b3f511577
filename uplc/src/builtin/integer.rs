use rug::ops::{DivRounding, RemRounding};

pub fn add(x: rug::Integer, y: rug::Integer) -> rug::Integer {
    x + y
}

pub fn subtract(x: rug::Integer, y: rug::Integer) -> rug::Integer {
    x - y
}

pub fn multiply(x: rug::Integer, y: rug::Integer) -> rug::Integer {
    x * y
}

pub fn divide(x: rug::Integer, y: rug::Integer) -> Option<rug::Integer> {
    if y.is_zero() { None } else { Some(x.div_floor(y)) }
}

pub fn modulo(x: rug::Integer, y: rug::Integer) -> Option<rug::Integer> {
    if y.is_zero() { None } else { Some(x.rem_floor(y)) }
}

pub fn quotient(x: rug::Integer, y: rug::Integer) -> Option<rug::Integer> {
    if y.is_zero() { None } else { Some(x / y) }
}

pub fn remainder(x: rug::Integer, y: rug::Integer) -> Option<rug::Integer> {
    if y.is_zero() { None } else { Some(x % y) }
}

pub fn equals(x: rug::Integer, y: rug::Integer) -> bool {
    x == y
}

pub fn less_than(x: rug::Integer, y: rug::Integer) -> bool {
    x < y
}

pub fn less_than_or_equal(x: rug::Integer, y: rug::Integer) -> bool {
    x <= y
}

pub fn to_bytes(big_endian: bool, width: rug::Integer, num: rug::Integer) -> Option<Vec<u8>> {
    let width = width.to_usize()?;
    if width > 8192 || num.is_negative() {
        return None;
    }
    let num_len = num.significant_digits::<u8>();
    if num_len > 8192 {
        return None;
    }

    let (mut bytes, padding) = if width == 0 {
        (vec![0; num_len], 0)
    } else {
        // A fixed width must be wide enough for the value.
        let padding = width.checked_sub(num_len)?;
        (vec![0; width], padding)
    };

    if big_endian {
        num.write_digits(&mut bytes[padding..], rug::integer::Order::Msf);
    } else {
        num.write_digits(&mut bytes[..num_len], rug::integer::Order::Lsf);
    }

    Some(bytes)
}

pub fn exp_mod(
    base: rug::Integer,
    exponent: rug::Integer,
    modulus: rug::Integer,
) -> Option<rug::Integer> {
    if modulus.cmp0() != std::cmp::Ordering::Greater {
        return None;
    }
    base.pow_mod(&exponent, &modulus).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_conventions() {
        // div/mod round toward negative infinity, quot/rem toward zero.
        assert_eq!(divide((-7).into(), 2.into()), Some((-4).into()));
        assert_eq!(modulo((-7).into(), 2.into()), Some(1.into()));
        assert_eq!(quotient((-7).into(), 2.into()), Some((-3).into()));
        assert_eq!(remainder((-7).into(), 2.into()), Some((-1).into()));
    }

    #[test]
    fn zero_divisors_fail() {
        assert_eq!(divide(5.into(), 0.into()), None);
        assert_eq!(modulo(5.into(), 0.into()), None);
        assert_eq!(quotient(5.into(), 0.into()), None);
        assert_eq!(remainder(5.into(), 0.into()), None);
    }

    #[test]
    fn byte_conversion() {
        assert_eq!(
            to_bytes(true, 4.into(), 0x1234.into()),
            Some(vec![0, 0, 0x12, 0x34])
        );
        assert_eq!(to_bytes(false, 0.into(), 0x1234.into()), Some(vec![0x34, 0x12]));
        // Width too small, negative input.
        assert_eq!(to_bytes(true, 1.into(), 0x1234.into()), None);
        assert_eq!(to_bytes(true, 0.into(), (-1).into()), None);
    }

    #[test]
    fn modular_exponent() {
        assert_eq!(exp_mod(2.into(), 10.into(), 1000.into()), Some(24.into()));
        assert_eq!(exp_mod(2.into(), (-1).into(), 4.into()), None);
        assert_eq!(exp_mod(2.into(), 3.into(), 0.into()), None);
        assert_eq!(exp_mod(3.into(), (-1).into(), 5.into()), Some(2.into()));
    }
}
