use crate::{
    Data,
    data::Construct,
    machine::{Error, Value},
};

pub fn choose(
    data: Data,
    construct: Value,
    map: Value,
    list: Value,
    integer: Value,
    bytes: Value,
) -> Value {
    match data {
        Data::Construct(_) => construct,
        Data::Map(_) => map,
        Data::List(_) => list,
        Data::Integer(_) => integer,
        Data::Bytes(_) => bytes,
    }
}

pub fn construct(tag: rug::Integer, fields: Vec<Data>) -> Data {
    Data::Construct(Construct {
        // We wrap here because this case is quite degenerate. The ledger
        // only produces tags that fit in 64 bits; anything else cannot be
        // re-serialized anyway.
        tag: tag.to_u64_wrapping(),
        value: fields,
    })
}

pub fn map(pairs: Vec<(Data, Data)>) -> Data {
    Data::Map(pairs)
}

pub fn list(elements: Vec<Data>) -> Data {
    Data::List(elements)
}

pub fn integer(i: rug::Integer) -> Data {
    Data::Integer(i)
}

pub fn bytes(b: Vec<u8>) -> Data {
    Data::Bytes(b)
}

pub fn un_construct(data: Data) -> Result<(rug::Integer, Vec<Data>), Error> {
    if let Data::Construct(Construct { tag, value }) = data {
        Ok((rug::Integer::from(tag), value))
    } else {
        Err(Error::DecodeError)
    }
}

pub fn un_map(data: Data) -> Result<Vec<(Data, Data)>, Error> {
    if let Data::Map(pairs) = data {
        Ok(pairs)
    } else {
        Err(Error::DecodeError)
    }
}

pub fn un_list(data: Data) -> Result<Vec<Data>, Error> {
    if let Data::List(elements) = data {
        Ok(elements)
    } else {
        Err(Error::DecodeError)
    }
}

pub fn un_integer(data: Data) -> Result<rug::Integer, Error> {
    if let Data::Integer(i) = data {
        Ok(i)
    } else {
        Err(Error::DecodeError)
    }
}

pub fn un_bytes(data: Data) -> Result<Vec<u8>, Error> {
    if let Data::Bytes(b) = data {
        Ok(b)
    } else {
        Err(Error::DecodeError)
    }
}

pub fn equals(data1: Data, data2: Data) -> bool {
    data1 == data2
}

pub fn mk_pair(first: Data, second: Data) -> (Data, Data) {
    (first, second)
}

pub fn serialize(data: Data) -> Vec<u8> {
    data.to_cbor()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eliminators_check_the_variant() {
        assert_eq!(un_integer(Data::Integer(7.into())), Ok(7.into()));
        assert_eq!(un_bytes(Data::Integer(7.into())), Err(Error::DecodeError));
        assert_eq!(
            un_construct(Data::Construct(Construct {
                tag: 3,
                value: vec![],
            })),
            Ok((3.into(), vec![]))
        );
    }
}
