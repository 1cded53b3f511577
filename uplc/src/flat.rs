//! The bit-level program encoding used on chain.
//!
//! Non obvious things about the format:
//! - The most significant bit of each byte is the first bit of the stream.
//! - Byte-aligned payloads (byte strings, `Data`) are preceded by padding:
//!   zero bits and a final one bit up to the next byte boundary. The same
//!   padding terminates a whole program.
//! - Lists (constant list elements, `case` branches, type tags) put a one
//!   bit before every element and a zero bit at the end.

use std::rc::Rc;

use crate::{
    Builtin, Data, DeBruijn, Program, Version,
    constant::{Array, Constant, List, Type},
    term::{Binding, Term},
};

/// A failure while decoding a flat-encoded program.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("input ended in the middle of a value")]
    UnexpectedEnd,
    #[error("invalid byte-boundary padding")]
    Padding,
    #[error("unknown term tag {0}")]
    UnknownTermTag(u8),
    #[error("unknown constant type tag")]
    UnknownTypeTag,
    #[error("unknown builtin tag {0}")]
    UnknownBuiltin(u8),
    #[error("unsupported program version")]
    UnknownVersion,
    #[error("variable index escapes its binders")]
    FreeVariable,
    #[error("natural number does not fit the target width")]
    Overflow,
    #[error("byte string is not valid UTF-8")]
    Utf8,
    #[error("constant payload is malformed")]
    MalformedConstant,
    #[error("trailing bytes after the program")]
    TrailingBytes,
}

pub struct Buffer {
    bytes: Vec<u8>,
    current: u8,
    used: u8,
}

impl Default for Buffer {
    fn default() -> Self {
        Buffer {
            bytes: Vec::new(),
            current: 0,
            used: 0,
        }
    }
}

impl Buffer {
    pub fn write_bit(&mut self, bit: bool) {
        self.current = (self.current << 1) | bit as u8;
        self.used += 1;
        if self.used == 8 {
            self.bytes.push(self.current);
            self.current = 0;
            self.used = 0;
        }
    }

    /// Write the low `count` bits of `value`, most significant first.
    pub fn write_bits(&mut self, value: u64, count: u8) {
        for i in (0..count).rev() {
            self.write_bit(value >> i & 1 == 1);
        }
    }

    /// Pad to the next byte boundary with zeroes and a final one bit. A
    /// full `0x01` byte is written when already aligned.
    pub fn pad(&mut self) {
        for _ in 0..(7 - self.used % 8) {
            self.write_bit(false);
        }
        self.write_bit(true);
    }

    /// Write whole bytes; the buffer must be aligned (see [`Buffer::pad`]).
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        debug_assert_eq!(self.used, 0, "write_bytes on an unaligned buffer");
        self.bytes.extend_from_slice(bytes);
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.pad();
        self.bytes
    }

    /// Number of bits written so far.
    pub fn bits(&self) -> usize {
        self.bytes.len() * 8 + self.used as usize
    }
}

pub struct Reader<'a> {
    bytes: &'a [u8],
    // Bit position.
    position: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, position: 0 }
    }

    pub fn read_bit(&mut self) -> Result<bool, Error> {
        let byte = self
            .bytes
            .get(self.position / 8)
            .ok_or(Error::UnexpectedEnd)?;
        let bit = byte >> (7 - self.position % 8) & 1 == 1;
        self.position += 1;
        Ok(bit)
    }

    pub fn read_bits(&mut self, count: u8) -> Result<u8, Error> {
        debug_assert!(count <= 8);
        let mut value = 0u8;
        for _ in 0..count {
            value = (value << 1) | self.read_bit()? as u8;
        }
        Ok(value)
    }

    /// Consume padding up to the next byte boundary: zero bits followed by
    /// a final one bit, a full byte when already aligned.
    pub fn read_padding(&mut self) -> Result<(), Error> {
        let count = 8 - (self.position % 8) as u8;
        if self.read_bits(count)? != 1 {
            return Err(Error::Padding);
        }
        Ok(())
    }

    /// Read a whole byte; the reader must be aligned.
    pub fn read_byte(&mut self) -> Result<u8, Error> {
        debug_assert_eq!(self.position % 8, 0, "read_byte on an unaligned reader");
        let byte = self
            .bytes
            .get(self.position / 8)
            .copied()
            .ok_or(Error::UnexpectedEnd)?;
        self.position += 8;
        Ok(byte)
    }

    pub fn at_end(&self) -> bool {
        self.position == self.bytes.len() * 8
    }
}

pub fn encode_natural(mut value: u64, buffer: &mut Buffer) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buffer.write_bits(byte as u64, 8);
            return;
        }
        buffer.write_bits((byte | 0x80) as u64, 8);
    }
}

pub fn decode_natural(reader: &mut Reader<'_>) -> Result<u64, Error> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = reader.read_bits(8)?;
        let chunk = (byte & 0x7f) as u64;
        if shift >= 64 || chunk > u64::MAX >> shift {
            return Err(Error::Overflow);
        }
        value |= chunk << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

/// Zigzag-encoded arbitrary-precision integer in 7-bit chunks.
pub fn encode_integer(integer: &rug::Integer, buffer: &mut Buffer) {
    let mut zigzag: rug::Integer = integer.clone() << 1u32;
    if integer.is_negative() {
        zigzag = -zigzag - 1u8;
    }
    loop {
        let byte = zigzag.to_u8_wrapping() & 0x7f;
        zigzag >>= 7;
        if zigzag.is_zero() {
            buffer.write_bits(byte as u64, 8);
            return;
        }
        buffer.write_bits((byte | 0x80) as u64, 8);
    }
}

pub fn decode_integer(reader: &mut Reader<'_>) -> Result<rug::Integer, Error> {
    let mut zigzag = rug::Integer::new();
    let mut shift = 0u32;
    loop {
        let byte = reader.read_bits(8)?;
        zigzag |= rug::Integer::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    Ok(if zigzag.is_odd() {
        -((zigzag + 1u8) >> 1u32)
    } else {
        zigzag >> 1u32
    })
}

fn encode_byte_string(bytes: &[u8], buffer: &mut Buffer) {
    buffer.pad();
    for chunk in bytes.chunks(255) {
        buffer.write_bytes(&[chunk.len() as u8]);
        buffer.write_bytes(chunk);
    }
    buffer.write_bytes(&[0]);
}

fn decode_byte_string(reader: &mut Reader<'_>) -> Result<Vec<u8>, Error> {
    reader.read_padding()?;
    let mut bytes = Vec::new();
    loop {
        let len = reader.read_byte()?;
        if len == 0 {
            return Ok(bytes);
        }
        bytes.reserve(len as usize);
        for _ in 0..len {
            bytes.push(reader.read_byte()?);
        }
    }
}

const TYPE_LIST: u8 = 5;
const TYPE_PAIR: u8 = 6;
const TYPE_APPLY: u8 = 7;
const TYPE_ARRAY: u8 = 12;

fn type_tags(ty: &Type, tags: &mut Vec<u8>) {
    match ty {
        Type::Integer => tags.push(0),
        Type::Bytes => tags.push(1),
        Type::String => tags.push(2),
        Type::Unit => tags.push(3),
        Type::Boolean => tags.push(4),
        Type::List(element) => {
            tags.extend([TYPE_APPLY, TYPE_LIST]);
            type_tags(element, tags);
        }
        Type::Pair(elements) => {
            tags.extend([TYPE_APPLY, TYPE_APPLY, TYPE_PAIR]);
            type_tags(&elements.0, tags);
            type_tags(&elements.1, tags);
        }
        Type::Data => tags.push(8),
        Type::BLSG1Element => tags.push(9),
        Type::BLSG2Element => tags.push(10),
        Type::MillerLoopResult => tags.push(11),
        Type::Array(element) => {
            tags.extend([TYPE_APPLY, TYPE_ARRAY]);
            type_tags(element, tags);
        }
    }
}

fn encode_type(ty: &Type, buffer: &mut Buffer) {
    let mut tags = Vec::new();
    type_tags(ty, &mut tags);
    for tag in tags {
        buffer.write_bit(true);
        buffer.write_bits(tag as u64, 4);
    }
    buffer.write_bit(false);
}

fn decode_type(reader: &mut Reader<'_>) -> Result<Type, Error> {
    let mut tags = Vec::new();
    while reader.read_bit()? {
        tags.push(reader.read_bits(4)?);
    }
    let (ty, rest) = parse_type_tags(&tags)?;
    if rest.is_empty() {
        Ok(ty)
    } else {
        Err(Error::UnknownTypeTag)
    }
}

fn parse_type_tags(tags: &[u8]) -> Result<(Type, &[u8]), Error> {
    let (&first, rest) = tags.split_first().ok_or(Error::UnknownTypeTag)?;
    let ty = match first {
        0 => Type::Integer,
        1 => Type::Bytes,
        2 => Type::String,
        3 => Type::Unit,
        4 => Type::Boolean,
        8 => Type::Data,
        9 => Type::BLSG1Element,
        10 => Type::BLSG2Element,
        11 => Type::MillerLoopResult,
        TYPE_APPLY => match rest.split_first() {
            Some((&TYPE_LIST, rest)) => {
                let (element, rest) = parse_type_tags(rest)?;
                return Ok((Type::List(Box::new(element)), rest));
            }
            Some((&TYPE_ARRAY, rest)) => {
                let (element, rest) = parse_type_tags(rest)?;
                return Ok((Type::Array(Box::new(element)), rest));
            }
            Some((&TYPE_APPLY, rest)) if rest.first() == Some(&TYPE_PAIR) => {
                let (first, rest) = parse_type_tags(&rest[1..])?;
                let (second, rest) = parse_type_tags(rest)?;
                return Ok((Type::Pair(Box::new((first, second))), rest));
            }
            _ => return Err(Error::UnknownTypeTag),
        },
        _ => return Err(Error::UnknownTypeTag),
    };
    Ok((ty, rest))
}

fn encode_constant_value(constant: &Constant, buffer: &mut Buffer) {
    match constant {
        Constant::Integer(integer) => encode_integer(integer, buffer),
        Constant::Bytes(bytes) => encode_byte_string(bytes, buffer),
        Constant::String(string) => encode_byte_string(string.as_bytes(), buffer),
        Constant::Unit => {}
        Constant::Boolean(b) => buffer.write_bit(*b),
        Constant::List(list) => encode_items(&list.items, buffer),
        Constant::Array(array) => encode_items(&array.0.items, buffer),
        Constant::Pair(pair) => {
            encode_constant_value(&pair.0, buffer);
            encode_constant_value(&pair.1, buffer);
        }
        Constant::Data(data) => encode_byte_string(&data.to_cbor(), buffer),
        Constant::BLSG1Element(point) => {
            encode_byte_string(&bls12_381::G1Affine::from(point).to_compressed(), buffer)
        }
        Constant::BLSG2Element(point) => {
            encode_byte_string(&bls12_381::G2Affine::from(point).to_compressed(), buffer)
        }
        Constant::MillerLoopResult(_) => {
            panic!("Miller loop results have no serialized form");
        }
    }
}

fn encode_items(items: &[Constant], buffer: &mut Buffer) {
    for item in items {
        buffer.write_bit(true);
        encode_constant_value(item, buffer);
    }
    buffer.write_bit(false);
}

fn decode_constant_value(ty: &Type, reader: &mut Reader<'_>) -> Result<Constant, Error> {
    Ok(match ty {
        Type::Integer => Constant::Integer(decode_integer(reader)?),
        Type::Bytes => Constant::Bytes(decode_byte_string(reader)?),
        Type::String => Constant::String(
            String::from_utf8(decode_byte_string(reader)?).map_err(|_| Error::Utf8)?,
        ),
        Type::Unit => Constant::Unit,
        Type::Boolean => Constant::Boolean(reader.read_bit()?),
        Type::List(element) => Constant::List(List::new(
            (**element).clone(),
            decode_items(element, reader)?,
        )),
        Type::Array(element) => Constant::Array(Array(List::new(
            (**element).clone(),
            decode_items(element, reader)?,
        ))),
        Type::Pair(elements) => Constant::Pair(Box::new((
            decode_constant_value(&elements.0, reader)?,
            decode_constant_value(&elements.1, reader)?,
        ))),
        Type::Data => Constant::Data(
            Data::from_cbor(&decode_byte_string(reader)?)
                .map_err(|_| Error::MalformedConstant)?,
        ),
        Type::BLSG1Element => {
            let bytes: [u8; 48] = decode_byte_string(reader)?
                .try_into()
                .map_err(|_| Error::MalformedConstant)?;
            let point = Option::<bls12_381::G1Affine>::from(
                bls12_381::G1Affine::from_compressed(&bytes),
            )
            .ok_or(Error::MalformedConstant)?;
            Constant::BLSG1Element(point.into())
        }
        Type::BLSG2Element => {
            let bytes: [u8; 96] = decode_byte_string(reader)?
                .try_into()
                .map_err(|_| Error::MalformedConstant)?;
            let point = Option::<bls12_381::G2Affine>::from(
                bls12_381::G2Affine::from_compressed(&bytes),
            )
            .ok_or(Error::MalformedConstant)?;
            Constant::BLSG2Element(point.into())
        }
        Type::MillerLoopResult => return Err(Error::MalformedConstant),
    })
}

fn decode_items(element: &Type, reader: &mut Reader<'_>) -> Result<Vec<Constant>, Error> {
    let mut items = Vec::new();
    while reader.read_bit()? {
        items.push(decode_constant_value(element, reader)?);
    }
    Ok(items)
}

const TERM_VARIABLE: u8 = 0;
const TERM_DELAY: u8 = 1;
const TERM_LAMBDA: u8 = 2;
const TERM_APPLICATION: u8 = 3;
const TERM_CONSTANT: u8 = 4;
const TERM_FORCE: u8 = 5;
const TERM_ERROR: u8 = 6;
const TERM_BUILTIN: u8 = 7;
const TERM_CONSTRUCT: u8 = 8;
const TERM_CASE: u8 = 9;

fn encode_term(term: &Term, buffer: &mut Buffer) {
    match term {
        Term::Variable(binding) => {
            buffer.write_bits(TERM_VARIABLE as u64, 4);
            encode_natural(binding.index.0 as u64, buffer);
        }
        Term::Delay(body) => {
            buffer.write_bits(TERM_DELAY as u64, 4);
            encode_term(body, buffer);
        }
        Term::Lambda { body, .. } => {
            buffer.write_bits(TERM_LAMBDA as u64, 4);
            encode_term(body, buffer);
        }
        Term::Application { function, argument } => {
            buffer.write_bits(TERM_APPLICATION as u64, 4);
            encode_term(function, buffer);
            encode_term(argument, buffer);
        }
        Term::Constant(constant) => {
            buffer.write_bits(TERM_CONSTANT as u64, 4);
            encode_type(&constant.type_of(), buffer);
            encode_constant_value(constant, buffer);
        }
        Term::Force(body) => {
            buffer.write_bits(TERM_FORCE as u64, 4);
            encode_term(body, buffer);
        }
        Term::Error => buffer.write_bits(TERM_ERROR as u64, 4),
        Term::Builtin(builtin) => {
            buffer.write_bits(TERM_BUILTIN as u64, 4);
            buffer.write_bits(*builtin as u64, 7);
        }
        Term::Construct { tag, fields } => {
            buffer.write_bits(TERM_CONSTRUCT as u64, 4);
            encode_natural(*tag, buffer);
            for field in fields {
                buffer.write_bit(true);
                encode_term(field, buffer);
            }
            buffer.write_bit(false);
        }
        Term::Case {
            scrutinee,
            branches,
        } => {
            buffer.write_bits(TERM_CASE as u64, 4);
            encode_term(scrutinee, buffer);
            for branch in branches {
                buffer.write_bit(true);
                encode_term(branch, buffer);
            }
            buffer.write_bit(false);
        }
    }
}

fn decode_term(reader: &mut Reader<'_>, version: &Version, depth: u32) -> Result<Rc<Term>, Error> {
    let tag = reader.read_bits(4)?;
    Ok(Rc::new(match tag {
        TERM_VARIABLE => {
            let index = decode_natural(reader)?;
            // Free variables are a fatal decoding error.
            if index == 0 || index > depth as u64 {
                return Err(Error::FreeVariable);
            }
            Term::Variable(Binding {
                name: Rc::from("i"),
                index: DeBruijn(index as u32),
            })
        }
        TERM_DELAY => Term::Delay(decode_term(reader, version, depth)?),
        TERM_LAMBDA => Term::Lambda {
            parameter: Rc::from("i"),
            body: decode_term(reader, version, depth + 1)?,
        },
        TERM_APPLICATION => Term::Application {
            function: decode_term(reader, version, depth)?,
            argument: decode_term(reader, version, depth)?,
        },
        TERM_CONSTANT => {
            let ty = decode_type(reader)?;
            Term::Constant(Rc::new(decode_constant_value(&ty, reader)?))
        }
        TERM_FORCE => Term::Force(decode_term(reader, version, depth)?),
        TERM_ERROR => Term::Error,
        TERM_BUILTIN => {
            let tag = reader.read_bits(7)?;
            Term::Builtin(Builtin::from_repr(tag).ok_or(Error::UnknownBuiltin(tag))?)
        }
        TERM_CONSTRUCT if version.has_datatypes() => {
            let tag = decode_natural(reader)?;
            let mut fields = Vec::new();
            while reader.read_bit()? {
                fields.push(decode_term(reader, version, depth)?);
            }
            Term::Construct { tag, fields }
        }
        TERM_CASE if version.has_datatypes() => {
            let scrutinee = decode_term(reader, version, depth)?;
            let mut branches = Vec::new();
            while reader.read_bit()? {
                branches.push(decode_term(reader, version, depth)?);
            }
            Term::Case {
                scrutinee,
                branches,
            }
        }
        other => return Err(Error::UnknownTermTag(other)),
    }))
}

impl Program {
    /// Encode to the flat wire format.
    ///
    /// # Panics
    ///
    /// Panics if the program contains a Miller loop result constant; those
    /// have no serialized form.
    pub fn to_flat(&self) -> Vec<u8> {
        let mut buffer = Buffer::default();
        encode_natural(self.version.major, &mut buffer);
        encode_natural(self.version.minor, &mut buffer);
        encode_natural(self.version.patch, &mut buffer);
        encode_term(&self.term, &mut buffer);
        buffer.finish()
    }

    /// Decode from the flat wire format. Unknown versions, unknown tags,
    /// free variables, and trailing garbage are all rejected.
    pub fn from_flat(bytes: &[u8]) -> Result<Program, Error> {
        let mut reader = Reader::new(bytes);
        let version = Version {
            major: decode_natural(&mut reader)?,
            minor: decode_natural(&mut reader)?,
            patch: decode_natural(&mut reader)?,
        };
        if version.major != 1 || version.minor > 1 || version.patch != 0 {
            return Err(Error::UnknownVersion);
        }
        let term = decode_term(&mut reader, &version, 0)?;
        reader.read_padding()?;
        if !reader.at_end() {
            return Err(Error::TrailingBytes);
        }
        Ok(Program { version, term })
    }
}

/// The size, in bits, of a constant's flat encoding (type tags included);
/// used by the inliner's size policy.
pub(crate) fn constant_bit_size(constant: &Constant) -> usize {
    let mut buffer = Buffer::default();
    encode_type(&constant.type_of(), &mut buffer);
    encode_constant_value(constant, &mut buffer);
    buffer.bits()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_integer(value: i64) {
        let integer = rug::Integer::from(value);
        let mut buffer = Buffer::default();
        encode_integer(&integer, &mut buffer);
        let bytes = buffer.finish();
        let mut reader = Reader::new(&bytes);
        assert_eq!(decode_integer(&mut reader).unwrap(), integer, "{value}");
    }

    #[test]
    fn integer_zigzag() {
        for value in [0, 1, -1, 2, -2, 63, 64, -64, -65, 12_345_678, i64::MIN] {
            roundtrip_integer(value);
        }

        // 1 zigzags to 2, -1 to 1.
        let mut buffer = Buffer::default();
        encode_integer(&rug::Integer::from(1), &mut buffer);
        assert_eq!(buffer.finish()[0], 0x02);
        let mut buffer = Buffer::default();
        encode_integer(&rug::Integer::from(-1), &mut buffer);
        assert_eq!(buffer.finish()[0], 0x01);
    }

    #[test]
    fn big_integers_roundtrip() {
        let big = rug::Integer::from_str_radix("123456789012345678901234567890", 10).unwrap();
        let mut buffer = Buffer::default();
        encode_integer(&big, &mut buffer);
        let bytes = buffer.finish();
        assert_eq!(decode_integer(&mut Reader::new(&bytes)).unwrap(), big);
    }

    #[test]
    fn natural_limits() {
        let mut buffer = Buffer::default();
        encode_natural(u64::MAX, &mut buffer);
        let bytes = buffer.finish();
        assert_eq!(decode_natural(&mut Reader::new(&bytes)).unwrap(), u64::MAX);
    }

    #[test]
    fn padding_is_checked() {
        let mut buffer = Buffer::default();
        buffer.write_bits(0b1010, 4);
        let bytes = buffer.finish();
        assert_eq!(bytes, vec![0b1010_0001]);

        let mut reader = Reader::new(&bytes);
        assert_eq!(reader.read_bits(4).unwrap(), 0b1010);
        reader.read_padding().unwrap();
        assert!(reader.at_end());

        let mut reader = Reader::new(&[0b1010_0011]);
        reader.read_bits(4).unwrap();
        assert_eq!(reader.read_padding(), Err(Error::Padding));
    }

    #[test]
    fn byte_strings_chunk() {
        let long = vec![0x5a; 600];
        let mut buffer = Buffer::default();
        buffer.write_bit(true);
        encode_byte_string(&long, &mut buffer);
        let bytes = buffer.finish();
        let mut reader = Reader::new(&bytes);
        assert!(reader.read_bit().unwrap());
        assert_eq!(decode_byte_string(&mut reader).unwrap(), long);
    }

    #[test]
    fn nested_types_roundtrip() {
        let ty = Type::List(Box::new(Type::Pair(Box::new((
            Type::Data,
            Type::List(Box::new(Type::Integer)),
        )))));
        let mut buffer = Buffer::default();
        encode_type(&ty, &mut buffer);
        let bytes = buffer.finish();
        assert_eq!(decode_type(&mut Reader::new(&bytes)).unwrap(), ty);
    }
}
