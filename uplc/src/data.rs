//! The `Data` constant and its canonical CBOR form.

use minicbor::{
    Encode,
    data::{IanaTag, Tag, Type},
};

use crate::lex;

/// The structured on-chain value.
///
/// Maps are ordered lists of pairs; the order is preserved through the CBOR
/// codec.
#[derive(Debug, Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub enum Data {
    Map(Vec<(Data, Data)>),
    List(Vec<Data>),
    Bytes(Vec<u8>),
    Integer(rug::Integer),
    Construct(Construct),
}

/// A tagged constructor application.
#[derive(Debug, Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Construct {
    pub tag: u64,
    pub value: Vec<Data>,
}

impl Default for Data {
    fn default() -> Self {
        Data::Integer(Default::default())
    }
}

impl Data {
    /// Encode to the canonical CBOR used by `serialiseData` and the ledger:
    /// definite-length collections, constructor tags 121–127 / 1280–1400 /
    /// 102, bignums outside the native integer range, and byte strings
    /// chunked at 64 bytes.
    pub fn to_cbor(&self) -> Vec<u8> {
        minicbor::to_vec(self).expect("writing to a vector does not fail")
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, minicbor::decode::Error> {
        let mut decoder = minicbor::Decoder::new(bytes);
        let data: Data = decoder.decode()?;
        if decoder.position() != bytes.len() {
            return Err(minicbor::decode::Error::message(
                "trailing bytes after data",
            ));
        }
        Ok(data)
    }

    /// The memory footprint used by the cost model: four words per node plus
    /// the footprint of the payloads.
    pub fn ex_memory(&self) -> i64 {
        let children = match self {
            Data::Map(items) => items
                .iter()
                .map(|(k, v)| k.ex_memory().saturating_add(v.ex_memory()))
                .fold(0i64, i64::saturating_add),
            Data::List(items) => items
                .iter()
                .map(Data::ex_memory)
                .fold(0i64, i64::saturating_add),
            Data::Bytes(bytes) => crate::constant::bytes_ex_memory(bytes.len()),
            Data::Integer(integer) => crate::constant::integer_ex_memory(integer),
            Data::Construct(Construct { value, .. }) => value
                .iter()
                .map(Data::ex_memory)
                .fold(0i64, i64::saturating_add),
        };
        children.saturating_add(4)
    }
}

impl<C> minicbor::Encode<C> for Data {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            Data::Map(items) => {
                e.map(items.len() as u64)?;
                for (k, v) in items {
                    k.encode(e, ctx)?;
                    v.encode(e, ctx)?;
                }
            }
            Data::List(items) => {
                e.array(items.len() as u64)?;
                for item in items {
                    item.encode(e, ctx)?;
                }
            }
            Data::Bytes(bytes) => encode_bounded_bytes(bytes, e)?,
            Data::Integer(integer) => encode_integer(integer, e)?,
            Data::Construct(Construct { tag, value }) => {
                match tag {
                    0..=6 => {
                        e.tag(Tag::new(121 + tag))?;
                    }
                    7..=127 => {
                        e.tag(Tag::new(1280 + (tag - 7)))?;
                    }
                    _ => {
                        e.tag(Tag::new(102))?;
                        e.array(2)?;
                        e.u64(*tag)?;
                    }
                }
                e.array(value.len() as u64)?;
                for item in value {
                    item.encode(e, ctx)?;
                }
            }
        }
        Ok(())
    }
}

impl<'b, C> minicbor::Decode<'b, C> for Data {
    fn decode(
        d: &mut minicbor::Decoder<'b>,
        ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        match d.datatype()? {
            Type::U8 | Type::U16 | Type::U32 | Type::U64 | Type::I8 | Type::I16 | Type::I32
            | Type::I64 | Type::Int => {
                let int = d.int()?;
                Ok(Data::Integer(rug::Integer::from(i128::from(int))))
            }
            Type::Bytes => Ok(Data::Bytes(d.bytes()?.to_vec())),
            Type::BytesIndef => {
                let mut full = Vec::new();
                for chunk in d.bytes_iter()? {
                    full.extend_from_slice(chunk?);
                }
                Ok(Data::Bytes(full))
            }
            Type::Array | Type::ArrayIndef => Ok(Data::List(d.decode_with(ctx)?)),
            Type::Map | Type::MapIndef => {
                let items: Result<Vec<(Data, Data)>, _> = d.map_iter()?.collect();
                Ok(Data::Map(items?))
            }
            Type::Tag => {
                let tag = d.tag()?.as_u64();
                match tag {
                    121..=127 => Ok(Data::Construct(Construct {
                        tag: tag - 121,
                        value: d.decode_with(ctx)?,
                    })),
                    1280..=1400 => Ok(Data::Construct(Construct {
                        tag: tag - 1280 + 7,
                        value: d.decode_with(ctx)?,
                    })),
                    102 => {
                        if d.array()? != Some(2) {
                            return Err(minicbor::decode::Error::message(
                                "alternative constructor must hold a tag and a value list",
                            ));
                        }
                        Ok(Data::Construct(Construct {
                            tag: d.u64()?,
                            value: d.decode_with(ctx)?,
                        }))
                    }
                    t if Tag::new(t) == IanaTag::PosBignum.tag() => {
                        Ok(Data::Integer(decode_bignum_bytes(d)?))
                    }
                    t if Tag::new(t) == IanaTag::NegBignum.tag() => {
                        let magnitude = decode_bignum_bytes(d)?;
                        Ok(Data::Integer(-(magnitude + 1u8)))
                    }
                    _ => Err(minicbor::decode::Error::message("unknown tag for data")),
                }
            }
            _ => Err(minicbor::decode::Error::message("bad cbor type for data")),
        }
    }
}

fn decode_bignum_bytes(
    d: &mut minicbor::Decoder<'_>,
) -> Result<rug::Integer, minicbor::decode::Error> {
    let bytes = match d.datatype()? {
        Type::BytesIndef => {
            let mut full = Vec::new();
            for chunk in d.bytes_iter()? {
                full.extend_from_slice(chunk?);
            }
            full
        }
        _ => d.bytes()?.to_vec(),
    };
    Ok(rug::Integer::from_digits(&bytes, rug::integer::Order::Msf))
}

/// Byte strings longer than 64 bytes become an indefinite sequence of
/// 64-byte definite chunks, per the ledger's `bounded_bytes` rule.
fn encode_bounded_bytes<W: minicbor::encode::Write>(
    bytes: &[u8],
    e: &mut minicbor::Encoder<W>,
) -> Result<(), minicbor::encode::Error<W::Error>> {
    if bytes.len() <= 64 {
        e.bytes(bytes)?;
    } else {
        e.begin_bytes()?;
        for chunk in bytes.chunks(64) {
            e.bytes(chunk)?;
        }
        e.end()?;
    }
    Ok(())
}

fn encode_integer<W: minicbor::encode::Write>(
    integer: &rug::Integer,
    e: &mut minicbor::Encoder<W>,
) -> Result<(), minicbor::encode::Error<W::Error>> {
    if let Some(v) = integer.to_u64() {
        e.u64(v)?;
    } else if let Some(v) = integer.to_i128().filter(|v| *v >= -(1i128 << 64)) {
        let int = minicbor::data::Int::try_from(v)
            .map_err(|_| minicbor::encode::Error::message("integer out of range"))?;
        e.int(int)?;
    } else if integer.is_negative() {
        let magnitude = rug::Integer::from(-integer) - 1u8;
        e.tag(IanaTag::NegBignum)?;
        encode_bounded_bytes(&magnitude.to_digits(rug::integer::Order::Msf), e)?;
    } else {
        e.tag(IanaTag::PosBignum)?;
        encode_bounded_bytes(&integer.to_digits(rug::integer::Order::Msf), e)?;
    }
    Ok(())
}

/// Parse the textual form, e.g. `Constr 0 [I 1, B #00]`.
pub(crate) fn parse(s: &str) -> Option<(Data, &str)> {
    let (ty, data_str) = s
        .split_once(char::is_whitespace)
        .map(|(a, b)| (a, b.trim_start()))
        .unwrap_or((s, ""));
    let (word_str, mut rest) = data_str
        .find(|c: char| c == ',' || c == ']' || c == ')')
        .map(|pos| (data_str[..pos].trim_end(), &data_str[pos..]))
        .unwrap_or((data_str.trim_end(), ""));
    let data = match ty {
        "B" => {
            let hex = word_str.strip_prefix('#')?;
            Data::Bytes(const_hex::decode(hex).ok()?)
        }
        "I" => Data::Integer(rug::Integer::from_str_radix(word_str, 10).ok()?),
        "List" => {
            let (items, list_rest) = parse_list(data_str)?;
            rest = list_rest;
            Data::List(items)
        }
        "Map" => {
            let (mut items_str, map_rest) = lex::group::<b'[', b']'>(data_str)?;
            rest = map_rest;
            let mut items = Vec::new();
            while !items_str.is_empty() {
                let (pair, other_pairs) = lex::group::<b'(', b')'>(items_str)?;
                items_str = other_pairs
                    .strip_prefix(',')
                    .map(str::trim_start)
                    .unwrap_or(other_pairs);
                let (key, pair_rest) = parse(pair)?;
                let (value, "") = parse(pair_rest.strip_prefix(',')?.trim_start())? else {
                    return None;
                };
                items.push((key, value));
            }
            Data::Map(items)
        }
        "Constr" => {
            let (tag_str, fields) = data_str.split_once(char::is_whitespace)?;
            let tag = tag_str.parse().ok()?;
            let (value, constr_rest) = parse_list(fields.trim_start())?;
            rest = constr_rest;
            Data::Construct(Construct { tag, value })
        }
        _ => return None,
    };

    Some((data, rest))
}

fn parse_list(s: &str) -> Option<(Vec<Data>, &str)> {
    let (mut items_str, rest) = lex::group::<b'[', b']'>(s)?;
    let mut items = Vec::new();
    while !items_str.is_empty() {
        let (item, mut list_rest) = parse(items_str)?;
        items.push(item);
        if let Some(r) = list_rest.strip_prefix(',') {
            list_rest = r.trim_start();
        } else if !list_rest.is_empty() {
            return None;
        }
        items_str = list_rest;
    }
    Some((items, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_tags() {
        let unit = Data::Construct(Construct {
            tag: 0,
            value: vec![],
        });
        assert_eq!(unit.to_cbor(), const_hex::decode("d87980").unwrap());

        let high = Data::Construct(Construct {
            tag: 7,
            value: vec![],
        });
        assert_eq!(high.to_cbor(), const_hex::decode("d9050080").unwrap());

        let huge = Data::Construct(Construct {
            tag: 500,
            value: vec![Data::Integer(1.into())],
        });
        assert_eq!(Data::from_cbor(&huge.to_cbor()).unwrap(), huge);
    }

    #[test]
    fn small_integers_are_native() {
        assert_eq!(Data::Integer(7.into()).to_cbor(), vec![0x07]);
        assert_eq!(Data::Integer((-1).into()).to_cbor(), vec![0x20]);
    }

    #[test]
    fn large_integers_are_bignums() {
        let big = Data::Integer(rug::Integer::from(1u8) << 70);
        let cbor = big.to_cbor();
        assert_eq!(cbor[0], 0xc2);
        assert_eq!(Data::from_cbor(&cbor).unwrap(), big);

        let negative = Data::Integer(-(rug::Integer::from(1u8) << 70u32));
        let cbor = negative.to_cbor();
        assert_eq!(cbor[0], 0xc3);
        assert_eq!(Data::from_cbor(&cbor).unwrap(), negative);
    }

    #[test]
    fn long_byte_strings_are_chunked() {
        let data = Data::Bytes(vec![0xab; 100]);
        let cbor = data.to_cbor();
        assert_eq!(cbor[0], 0x5f);
        assert_eq!(Data::from_cbor(&cbor).unwrap(), data);
    }

    #[test]
    fn map_order_is_preserved() {
        let map = Data::Map(vec![
            (Data::Integer(2.into()), Data::Integer(0.into())),
            (Data::Integer(1.into()), Data::Integer(0.into())),
        ]);
        assert_eq!(Data::from_cbor(&map.to_cbor()).unwrap(), map);
    }

    #[test]
    fn footprint_is_additive() {
        let leaf = Data::Integer(7.into());
        assert_eq!(leaf.ex_memory(), 5);
        let node = Data::List(vec![leaf.clone(), leaf]);
        assert_eq!(node.ex_memory(), 4 + 5 + 5);
    }

    #[test]
    fn parse_textual_form() {
        let (data, rest) = parse("Constr 1 [I 2, B #ff, List [I 3]]").unwrap();
        assert_eq!(rest, "");
        assert_eq!(
            data,
            Data::Construct(Construct {
                tag: 1,
                value: vec![
                    Data::Integer(2.into()),
                    Data::Bytes(vec![0xff]),
                    Data::List(vec![Data::Integer(3.into())]),
                ],
            })
        );
    }
}
