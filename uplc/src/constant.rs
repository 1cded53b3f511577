//! The constants carried by programs and produced by builtins.

use bls12_381::{G1Affine, G1Projective, G2Affine, G2Projective, MillerLoopResult};

use crate::{Data, data, lex};

/// The type of a constant, as carried by the wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Integer,
    Bytes,
    String,
    Unit,
    Boolean,
    List(Box<Type>),
    Pair(Box<(Type, Type)>),
    Data,
    BLSG1Element,
    BLSG2Element,
    MillerLoopResult,
    Array(Box<Type>),
}

/// A homogeneous list; the element type is kept so empty lists stay typed.
#[derive(Debug, Clone, PartialEq)]
pub struct List {
    pub element: Type,
    pub items: Vec<Constant>,
}

impl List {
    pub fn new(element: Type, items: Vec<Constant>) -> Self {
        List { element, items }
    }

    pub fn data(items: Vec<Data>) -> Self {
        List {
            element: Type::Data,
            items: items.into_iter().map(Constant::Data).collect(),
        }
    }

    pub fn pair_data(items: Vec<(Data, Data)>) -> Self {
        List {
            element: Type::Pair(Box::new((Type::Data, Type::Data))),
            items: items
                .into_iter()
                .map(|(k, v)| Constant::Pair(Box::new((Constant::Data(k), Constant::Data(v)))))
                .collect(),
        }
    }
}

/// An immutable array; shares the list representation.
#[derive(Debug, Clone, PartialEq)]
pub struct Array(pub List);

/// A constant value.
#[derive(Debug, Clone)]
pub enum Constant {
    Integer(rug::Integer),
    Bytes(Vec<u8>),
    String(String),
    Unit,
    Boolean(bool),
    List(List),
    Pair(Box<(Constant, Constant)>),
    Data(Data),
    BLSG1Element(G1Projective),
    BLSG2Element(G2Projective),
    /// Transient result of a Miller loop; never serialized and never equal
    /// to anything, itself included.
    MillerLoopResult(MillerLoopResult),
    Array(Array),
}

impl PartialEq for Constant {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Constant::Integer(a), Constant::Integer(b)) => a == b,
            (Constant::Bytes(a), Constant::Bytes(b)) => a == b,
            (Constant::String(a), Constant::String(b)) => a == b,
            (Constant::Unit, Constant::Unit) => true,
            (Constant::Boolean(a), Constant::Boolean(b)) => a == b,
            (Constant::List(a), Constant::List(b)) => a == b,
            (Constant::Pair(a), Constant::Pair(b)) => a == b,
            (Constant::Data(a), Constant::Data(b)) => a == b,
            (Constant::BLSG1Element(a), Constant::BLSG1Element(b)) => a == b,
            (Constant::BLSG2Element(a), Constant::BLSG2Element(b)) => a == b,
            (Constant::Array(a), Constant::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl Constant {
    pub fn type_of(&self) -> Type {
        match self {
            Constant::Integer(_) => Type::Integer,
            Constant::Bytes(_) => Type::Bytes,
            Constant::String(_) => Type::String,
            Constant::Unit => Type::Unit,
            Constant::Boolean(_) => Type::Boolean,
            Constant::List(list) => Type::List(Box::new(list.element.clone())),
            Constant::Pair(pair) => {
                Type::Pair(Box::new((pair.0.type_of(), pair.1.type_of())))
            }
            Constant::Data(_) => Type::Data,
            Constant::BLSG1Element(_) => Type::BLSG1Element,
            Constant::BLSG2Element(_) => Type::BLSG2Element,
            Constant::MillerLoopResult(_) => Type::MillerLoopResult,
            Constant::Array(array) => Type::Array(Box::new(array.0.element.clone())),
        }
    }

    /// The memory footprint consumed by the cost model.
    pub fn ex_memory(&self) -> i64 {
        match self {
            Constant::Integer(integer) => integer_ex_memory(integer),
            Constant::Bytes(bytes) => bytes_ex_memory(bytes.len()),
            Constant::String(string) => (string.chars().count() as i64).max(1),
            Constant::Unit | Constant::Boolean(_) => 1,
            Constant::List(list) => list
                .items
                .iter()
                .map(Constant::ex_memory)
                .fold(1i64, i64::saturating_add),
            Constant::Array(array) => array
                .0
                .items
                .iter()
                .map(Constant::ex_memory)
                .fold(1i64, i64::saturating_add),
            Constant::Pair(pair) => 1i64
                .saturating_add(pair.0.ex_memory())
                .saturating_add(pair.1.ex_memory()),
            Constant::Data(d) => d.ex_memory(),
            Constant::BLSG1Element(_) => 18,
            Constant::BLSG2Element(_) => 36,
            Constant::MillerLoopResult(_) => 72,
        }
    }

    /// Parse the textual form: a type followed by a value, as it appears
    /// inside `(con … …)`.
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        let (ty_str, rest) = lex::constant_type(s).ok_or(ParseError::UnknownType)?;
        let (ty, trailing) = parse_type(ty_str)?;
        if !trailing.is_empty() {
            return Err(ParseError::UnknownType);
        }
        let (constant, rest) = parse_value(&ty, rest.trim_start())?;
        if rest.is_empty() {
            Ok(constant)
        } else {
            Err(ParseError::TrailingContent)
        }
    }
}

/// `ceil(bits / 64)`, with zero costing one word.
pub(crate) fn integer_ex_memory(integer: &rug::Integer) -> i64 {
    ((integer.significant_bits() as i64 + 63) / 64).max(1)
}

/// `ceil(len / 8)`, with the empty string costing one word.
pub(crate) fn bytes_ex_memory(len: usize) -> i64 {
    ((len as i64 + 7) / 8).max(1)
}

fn parse_type(s: &str) -> Result<(Type, &str), ParseError> {
    let (word, rest) = lex::word(s);
    let ty = match word {
        "integer" => Type::Integer,
        "bytestring" => Type::Bytes,
        "string" => Type::String,
        "bool" => Type::Boolean,
        "unit" => Type::Unit,
        "data" => Type::Data,
        "bls12_381_G1_element" => Type::BLSG1Element,
        "bls12_381_G2_element" => Type::BLSG2Element,
        "list" | "array" => {
            let (element_str, rest) = lex::constant_type(rest).ok_or(ParseError::UnknownType)?;
            let (element, trailing) = parse_type(element_str)?;
            if !trailing.is_empty() {
                return Err(ParseError::UnknownType);
            }
            let ty = if word == "list" {
                Type::List(Box::new(element))
            } else {
                Type::Array(Box::new(element))
            };
            return Ok((ty, rest));
        }
        "pair" => {
            let (first_str, rest) = lex::constant_type(rest).ok_or(ParseError::Pair)?;
            let (second_str, rest) = lex::constant_type(rest).ok_or(ParseError::Pair)?;
            let (first, t0) = parse_type(first_str)?;
            let (second, t1) = parse_type(second_str)?;
            if !t0.is_empty() || !t1.is_empty() {
                return Err(ParseError::Pair);
            }
            return Ok((Type::Pair(Box::new((first, second))), rest));
        }
        _ => return Err(ParseError::UnknownType),
    };
    Ok((ty, rest))
}

fn parse_value<'a>(ty: &Type, s: &'a str) -> Result<(Constant, &'a str), ParseError> {
    let (atom, atom_rest) = atom(s);
    let constant = match ty {
        Type::Integer => rug::Integer::from_str_radix(atom, 10)
            .map(Constant::Integer)
            .map_err(|_| ParseError::Integer)?,
        Type::Bytes => {
            let hex = atom.strip_prefix('#').ok_or(ParseError::Bytestring)?;
            Constant::Bytes(const_hex::decode(hex).map_err(|_| ParseError::Bytestring)?)
        }
        Type::String => {
            let (string, rest) = lex::string(s).ok_or(ParseError::String)?;
            return Ok((Constant::String(string), rest));
        }
        Type::Boolean => match atom {
            "True" => Constant::Boolean(true),
            "False" => Constant::Boolean(false),
            _ => return Err(ParseError::Boolean),
        },
        Type::Unit => {
            if s.starts_with("()") {
                return Ok((Constant::Unit, s[2..].trim_start()));
            }
            return Err(ParseError::Unit);
        }
        Type::Data => {
            let (d, rest) = if s.starts_with('(') {
                let (inner, rest) = lex::group::<b'(', b')'>(s).ok_or(ParseError::Data)?;
                let Some((d, "")) = data::parse(inner) else {
                    return Err(ParseError::Data);
                };
                (d, rest)
            } else {
                data::parse(s).ok_or(ParseError::Data)?
            };
            return Ok((Constant::Data(d), rest));
        }
        Type::BLSG1Element => {
            let bytes = point_hex(atom).ok_or(ParseError::BLSG1Element)?;
            let compressed: [u8; 48] = bytes.try_into().map_err(|_| ParseError::BLSG1Element)?;
            let point = Option::<G1Affine>::from(G1Affine::from_compressed(&compressed))
                .ok_or(ParseError::BLSG1Element)?;
            Constant::BLSG1Element(G1Projective::from(point))
        }
        Type::BLSG2Element => {
            let bytes = point_hex(atom).ok_or(ParseError::BLSG2Element)?;
            let compressed: [u8; 96] = bytes.try_into().map_err(|_| ParseError::BLSG2Element)?;
            let point = Option::<G2Affine>::from(G2Affine::from_compressed(&compressed))
                .ok_or(ParseError::BLSG2Element)?;
            Constant::BLSG2Element(G2Projective::from(point))
        }
        Type::MillerLoopResult => return Err(ParseError::UnknownType),
        Type::List(element) | Type::Array(element) => {
            let (mut items_str, rest) = lex::group::<b'[', b']'>(s).ok_or(ParseError::List)?;
            let mut items = Vec::new();
            while !items_str.is_empty() {
                let (item, item_rest) = parse_value(element, items_str)?;
                items.push(item);
                items_str = match item_rest.strip_prefix(',') {
                    Some(r) => r.trim_start(),
                    None if item_rest.is_empty() => item_rest,
                    None => return Err(ParseError::List),
                };
            }
            let list = List::new((**element).clone(), items);
            let constant = if matches!(ty, Type::List(_)) {
                Constant::List(list)
            } else {
                Constant::Array(Array(list))
            };
            return Ok((constant, rest));
        }
        Type::Pair(elements) => {
            let (inner, rest) = lex::group::<b'(', b')'>(s).ok_or(ParseError::Pair)?;
            let (first, inner_rest) = parse_value(&elements.0, inner)?;
            let inner_rest = inner_rest.strip_prefix(',').ok_or(ParseError::Pair)?;
            let (second, inner_rest) = parse_value(&elements.1, inner_rest.trim_start())?;
            if !inner_rest.is_empty() {
                return Err(ParseError::Pair);
            }
            return Ok((Constant::Pair(Box::new((first, second))), rest));
        }
    };
    Ok((constant, atom_rest))
}

/// Split a bare token: everything up to whitespace or a separator.
fn atom(s: &str) -> (&str, &str) {
    match s.find(|c: char| c.is_whitespace() || c == ',' || c == ']' || c == ')') {
        Some(pos) => (&s[..pos], s[pos..].trim_start_matches(char::is_whitespace)),
        None => (s, ""),
    }
}

fn point_hex(s: &str) -> Option<Vec<u8>> {
    const_hex::decode(s.strip_prefix("0x")?).ok()
}

/// An error that can occur when parsing a constant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, thiserror::Error)]
pub enum ParseError {
    #[error("unknown constant type")]
    UnknownType,
    #[error("invalid integer format")]
    Integer,
    #[error("invalid bytestring format")]
    Bytestring,
    #[error("invalid string format")]
    String,
    #[error("invalid boolean format")]
    Boolean,
    #[error("invalid unit format")]
    Unit,
    #[error("invalid data format")]
    Data,
    #[error("invalid BLS G1 element format")]
    BLSG1Element,
    #[error("invalid BLS G2 element format")]
    BLSG2Element,
    #[error("invalid list format")]
    List,
    #[error("invalid pair format")]
    Pair,
    #[error("trailing content after constant")]
    TrailingContent,
}

// `TryFrom` implementations used to pass constants into builtins.

impl TryFrom<Constant> for rug::Integer {
    type Error = ();

    fn try_from(value: Constant) -> Result<Self, Self::Error> {
        if let Constant::Integer(i) = value { Ok(i) } else { Err(()) }
    }
}

impl TryFrom<Constant> for Vec<u8> {
    type Error = ();

    fn try_from(value: Constant) -> Result<Self, Self::Error> {
        if let Constant::Bytes(b) = value { Ok(b) } else { Err(()) }
    }
}

impl TryFrom<Constant> for String {
    type Error = ();

    fn try_from(value: Constant) -> Result<Self, Self::Error> {
        if let Constant::String(s) = value { Ok(s) } else { Err(()) }
    }
}

impl TryFrom<Constant> for () {
    type Error = ();

    fn try_from(value: Constant) -> Result<Self, Self::Error> {
        if let Constant::Unit = value { Ok(()) } else { Err(()) }
    }
}

impl TryFrom<Constant> for bool {
    type Error = ();

    fn try_from(value: Constant) -> Result<Self, Self::Error> {
        if let Constant::Boolean(b) = value { Ok(b) } else { Err(()) }
    }
}

impl TryFrom<Constant> for List {
    type Error = ();

    fn try_from(value: Constant) -> Result<Self, Self::Error> {
        if let Constant::List(l) = value { Ok(l) } else { Err(()) }
    }
}

impl TryFrom<Constant> for Array {
    type Error = ();

    fn try_from(value: Constant) -> Result<Self, Self::Error> {
        if let Constant::Array(a) = value { Ok(a) } else { Err(()) }
    }
}

impl TryFrom<Constant> for Data {
    type Error = ();

    fn try_from(value: Constant) -> Result<Self, Self::Error> {
        if let Constant::Data(d) = value { Ok(d) } else { Err(()) }
    }
}

impl TryFrom<Constant> for Vec<Data> {
    type Error = ();

    fn try_from(value: Constant) -> Result<Self, Self::Error> {
        let Constant::List(list) = value else { return Err(()) };
        if list.element != Type::Data {
            return Err(());
        }
        list.items
            .into_iter()
            .map(|item| match item {
                Constant::Data(d) => Ok(d),
                _ => Err(()),
            })
            .collect()
    }
}

impl TryFrom<Constant> for Vec<(Data, Data)> {
    type Error = ();

    fn try_from(value: Constant) -> Result<Self, Self::Error> {
        let Constant::List(list) = value else { return Err(()) };
        if list.element != Type::Pair(Box::new((Type::Data, Type::Data))) {
            return Err(());
        }
        list.items
            .into_iter()
            .map(|item| match item {
                Constant::Pair(pair) => match *pair {
                    (Constant::Data(k), Constant::Data(v)) => Ok((k, v)),
                    _ => Err(()),
                },
                _ => Err(()),
            })
            .collect()
    }
}

impl TryFrom<Constant> for Vec<rug::Integer> {
    type Error = ();

    fn try_from(value: Constant) -> Result<Self, Self::Error> {
        let Constant::List(list) = value else { return Err(()) };
        if list.element != Type::Integer {
            return Err(());
        }
        list.items
            .into_iter()
            .map(|item| match item {
                Constant::Integer(i) => Ok(i),
                _ => Err(()),
            })
            .collect()
    }
}

impl TryFrom<Constant> for (Constant, Constant) {
    type Error = ();

    fn try_from(value: Constant) -> Result<Self, Self::Error> {
        if let Constant::Pair(p) = value { Ok(*p) } else { Err(()) }
    }
}

impl TryFrom<Constant> for G1Projective {
    type Error = ();

    fn try_from(value: Constant) -> Result<Self, Self::Error> {
        if let Constant::BLSG1Element(p) = value { Ok(p) } else { Err(()) }
    }
}

impl TryFrom<Constant> for G2Projective {
    type Error = ();

    fn try_from(value: Constant) -> Result<Self, Self::Error> {
        if let Constant::BLSG2Element(p) = value { Ok(p) } else { Err(()) }
    }
}

impl TryFrom<Constant> for MillerLoopResult {
    type Error = ();

    fn try_from(value: Constant) -> Result<Self, Self::Error> {
        if let Constant::MillerLoopResult(r) = value { Ok(r) } else { Err(()) }
    }
}

// `From` implementations used to turn builtin results back into constants.

impl From<rug::Integer> for Constant {
    fn from(value: rug::Integer) -> Self {
        Constant::Integer(value)
    }
}

impl From<Vec<u8>> for Constant {
    fn from(value: Vec<u8>) -> Self {
        Constant::Bytes(value)
    }
}

impl From<String> for Constant {
    fn from(value: String) -> Self {
        Constant::String(value)
    }
}

impl From<()> for Constant {
    fn from((): ()) -> Self {
        Constant::Unit
    }
}

impl From<bool> for Constant {
    fn from(value: bool) -> Self {
        Constant::Boolean(value)
    }
}

impl From<List> for Constant {
    fn from(value: List) -> Self {
        Constant::List(value)
    }
}

impl From<Array> for Constant {
    fn from(value: Array) -> Self {
        Constant::Array(value)
    }
}

impl From<Data> for Constant {
    fn from(value: Data) -> Self {
        Constant::Data(value)
    }
}

impl From<Vec<Data>> for Constant {
    fn from(value: Vec<Data>) -> Self {
        Constant::List(List::data(value))
    }
}

impl From<Vec<(Data, Data)>> for Constant {
    fn from(value: Vec<(Data, Data)>) -> Self {
        Constant::List(List::pair_data(value))
    }
}

impl From<(Data, Data)> for Constant {
    fn from((first, second): (Data, Data)) -> Self {
        Constant::Pair(Box::new((Constant::Data(first), Constant::Data(second))))
    }
}

impl From<(rug::Integer, Vec<Data>)> for Constant {
    fn from((tag, fields): (rug::Integer, Vec<Data>)) -> Self {
        Constant::Pair(Box::new((
            Constant::Integer(tag),
            Constant::List(List::data(fields)),
        )))
    }
}

impl From<G1Projective> for Constant {
    fn from(value: G1Projective) -> Self {
        Constant::BLSG1Element(value)
    }
}

impl From<G2Projective> for Constant {
    fn from(value: G2Projective) -> Self {
        Constant::BLSG2Element(value)
    }
}

impl From<MillerLoopResult> for Constant {
    fn from(value: MillerLoopResult) -> Self {
        Constant::MillerLoopResult(value)
    }
}
