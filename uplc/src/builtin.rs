//! Builtin functions supported by the CEK machine.
//!
//! Each builtin function is defined in the [specification][spec] section
//! 4.3. The submodules contain implementations of built-in functions
//! roughly grouped by their types; this module holds the table itself:
//! arity, required forces, cost-function shapes, and the dispatch into the
//! implementations.
//!
//! [spec]: https://plutus.cardano.intersectmbo.org/resources/plutus-core-spec.pdf

use std::rc::Rc;

use strum::{EnumString, FromRepr, IntoStaticStr};

use crate::{
    Constant,
    cost::{
        self, Category, Plutus,
        function::{Function, Pair},
    },
    machine::{self, Logger, Value},
};

mod array;
mod bls12_381;
mod bytestring;
mod data;
mod digest;
mod ed25519;
mod integer;
mod k256;
mod list;
mod string;

/// Builtin functions supported by the evaluator.
///
/// The discriminants are the stable 7-bit tags of the wire format.
#[repr(u8)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, FromRepr, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "camelCase")]
pub enum Builtin {
    // Integers
    AddInteger,
    SubtractInteger,
    MultiplyInteger,
    DivideInteger,
    QuotientInteger,
    RemainderInteger,
    ModInteger,
    EqualsInteger,
    LessThanInteger,
    LessThanEqualsInteger,
    // Bytestrings
    AppendByteString,
    ConsByteString,
    SliceByteString,
    LengthOfByteString,
    IndexByteString,
    EqualsByteString,
    LessThanByteString,
    LessThanEqualsByteString,
    // Cryptography and hashes
    #[strum(serialize = "sha2_256")]
    Sha2_256,
    #[strum(serialize = "sha3_256")]
    Sha3_256,
    #[strum(serialize = "blake2b_256")]
    Blake2b256,
    VerifyEd25519Signature,
    VerifyEcdsaSecp256k1Signature = 52,
    VerifySchnorrSecp256k1Signature,
    // Strings
    AppendString = 22,
    EqualsString,
    EncodeUtf8,
    DecodeUtf8,
    // Bool
    IfThenElse,
    // Unit
    ChooseUnit,
    // Tracing
    Trace,
    // Pairs
    FstPair,
    SndPair,
    // Lists
    ChooseList,
    MkCons,
    HeadList,
    TailList,
    NullList,
    // Data
    ChooseData,
    ConstrData,
    MapData,
    ListData,
    IData,
    BData,
    UnConstrData,
    UnMapData,
    UnListData,
    UnIData,
    UnBData,
    EqualsData,
    // Misc monomorphized constructors.
    MkPairData,
    MkNilData,
    MkNilPairData,
    SerialiseData,
    // BLS12_381 operations
    // G1
    #[strum(serialize = "bls12_381_G1_add")]
    BlsG1Add = 54,
    #[strum(serialize = "bls12_381_G1_neg")]
    BlsG1Neg,
    #[strum(serialize = "bls12_381_G1_scalarMul")]
    BlsG1ScalarMul,
    #[strum(serialize = "bls12_381_G1_equal")]
    BlsG1Equal,
    #[strum(serialize = "bls12_381_G1_compress")]
    BlsG1Compress,
    #[strum(serialize = "bls12_381_G1_uncompress")]
    BlsG1Uncompress,
    #[strum(serialize = "bls12_381_G1_hashToGroup")]
    BlsG1HashToGroup,
    // G2
    #[strum(serialize = "bls12_381_G2_add")]
    BlsG2Add,
    #[strum(serialize = "bls12_381_G2_neg")]
    BlsG2Neg,
    #[strum(serialize = "bls12_381_G2_scalarMul")]
    BlsG2ScalarMul,
    #[strum(serialize = "bls12_381_G2_equal")]
    BlsG2Equal,
    #[strum(serialize = "bls12_381_G2_compress")]
    BlsG2Compress,
    #[strum(serialize = "bls12_381_G2_uncompress")]
    BlsG2Uncompress,
    #[strum(serialize = "bls12_381_G2_hashToGroup")]
    BlsG2HashToGroup,
    // Pairing
    #[strum(serialize = "bls12_381_millerLoop")]
    BlsMillerLoop,
    #[strum(serialize = "bls12_381_mulMlResult")]
    BlsMulMlResult,
    #[strum(serialize = "bls12_381_finalVerify")]
    BlsFinalVerify,
    // Keccak_256, Blake2b_224
    #[strum(serialize = "keccak_256")]
    Keccak256,
    #[strum(serialize = "blake2b_224")]
    Blake2b224,
    // Conversions
    IntegerToByteString,
    ByteStringToInteger,
    // Logical
    AndByteString,
    OrByteString,
    XorByteString,
    ComplementByteString,
    ReadBit,
    WriteBits,
    ReplicateByte,
    // Bitwise
    ShiftByteString,
    RotateByteString,
    CountSetBits,
    FindFirstSetBit,
    // Ripemd_160
    #[strum(serialize = "ripemd_160")]
    Ripemd160,
    // Batch 6
    ExpModInteger,
    DropList,
    // Arrays
    LengthOfArray,
    ListToArray,
    IndexArray,
    MultiIndexArray = 94,
}

/// Which era's builtin semantics apply.
///
/// Variant `A` is the pre-Conway behavior, `B` the post-Conway one. The two
/// only differ for `consByteString`: `B` reduces the head byte modulo 256
/// where `A` fails outside `0..=255`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Semantics {
    A,
    B,
}

impl Semantics {
    pub fn default_for(plutus: Plutus) -> Semantics {
        match plutus {
            Plutus::V1 => Semantics::A,
            Plutus::V2 | Plutus::V3 => Semantics::B,
        }
    }
}

impl Builtin {
    /// Returns the number of quantifier arguments (`∀`) of the builtin
    /// function: the forces required before any value argument is accepted.
    pub fn quantifiers(&self) -> u8 {
        match self {
            Builtin::IfThenElse
            | Builtin::ChooseUnit
            | Builtin::Trace
            | Builtin::MkCons
            | Builtin::HeadList
            | Builtin::TailList
            | Builtin::NullList
            | Builtin::ChooseData
            | Builtin::DropList
            | Builtin::LengthOfArray
            | Builtin::ListToArray
            | Builtin::IndexArray
            | Builtin::MultiIndexArray => 1,
            Builtin::FstPair | Builtin::SndPair | Builtin::ChooseList => 2,
            _ => 0,
        }
    }

    /// Returns the arity (number of value arguments) of the builtin
    /// function.
    pub fn arity(&self) -> u8 {
        match self {
            // Integers
            Builtin::AddInteger => 2,
            Builtin::SubtractInteger => 2,
            Builtin::MultiplyInteger => 2,
            Builtin::DivideInteger => 2,
            Builtin::QuotientInteger => 2,
            Builtin::RemainderInteger => 2,
            Builtin::ModInteger => 2,
            Builtin::EqualsInteger => 2,
            Builtin::LessThanInteger => 2,
            Builtin::LessThanEqualsInteger => 2,
            Builtin::ExpModInteger => 3,

            // Bytestrings
            Builtin::AppendByteString => 2,
            Builtin::ConsByteString => 2,
            Builtin::SliceByteString => 3,
            Builtin::LengthOfByteString => 1,
            Builtin::IndexByteString => 2,
            Builtin::EqualsByteString => 2,
            Builtin::LessThanByteString => 2,
            Builtin::LessThanEqualsByteString => 2,
            Builtin::AndByteString => 3,
            Builtin::OrByteString => 3,
            Builtin::XorByteString => 3,
            Builtin::ComplementByteString => 1,
            Builtin::ReadBit => 2,
            Builtin::WriteBits => 3,
            Builtin::ReplicateByte => 2,
            Builtin::ShiftByteString => 2,
            Builtin::RotateByteString => 2,
            Builtin::CountSetBits => 1,
            Builtin::FindFirstSetBit => 1,
            Builtin::IntegerToByteString => 3,
            Builtin::ByteStringToInteger => 2,

            // Cryptography and hashes
            Builtin::Sha2_256 => 1,
            Builtin::Sha3_256 => 1,
            Builtin::Blake2b256 => 1,
            Builtin::Blake2b224 => 1,
            Builtin::Keccak256 => 1,
            Builtin::Ripemd160 => 1,
            Builtin::VerifyEd25519Signature => 3,
            Builtin::VerifyEcdsaSecp256k1Signature => 3,
            Builtin::VerifySchnorrSecp256k1Signature => 3,

            // Strings
            Builtin::AppendString => 2,
            Builtin::EqualsString => 2,
            Builtin::EncodeUtf8 => 1,
            Builtin::DecodeUtf8 => 1,

            // Bool and unit
            Builtin::IfThenElse => 3,
            Builtin::ChooseUnit => 2,
            Builtin::Trace => 2,
            Builtin::FstPair => 1,
            Builtin::SndPair => 1,

            // Lists
            Builtin::ChooseList => 3,
            Builtin::MkCons => 2,
            Builtin::HeadList => 1,
            Builtin::TailList => 1,
            Builtin::NullList => 1,
            Builtin::DropList => 2,

            // Data
            Builtin::ChooseData => 6,
            Builtin::ConstrData => 2,
            Builtin::MapData => 1,
            Builtin::ListData => 1,
            Builtin::IData => 1,
            Builtin::BData => 1,
            Builtin::UnConstrData => 1,
            Builtin::UnMapData => 1,
            Builtin::UnListData => 1,
            Builtin::UnIData => 1,
            Builtin::UnBData => 1,
            Builtin::EqualsData => 2,
            Builtin::SerialiseData => 1,
            Builtin::MkPairData => 2,
            Builtin::MkNilData => 1,
            Builtin::MkNilPairData => 1,

            // BLS12_381 operations
            Builtin::BlsG1Add => 2,
            Builtin::BlsG1Neg => 1,
            Builtin::BlsG1ScalarMul => 2,
            Builtin::BlsG1Equal => 2,
            Builtin::BlsG1HashToGroup => 2,
            Builtin::BlsG1Compress => 1,
            Builtin::BlsG1Uncompress => 1,
            Builtin::BlsG2Add => 2,
            Builtin::BlsG2Neg => 1,
            Builtin::BlsG2ScalarMul => 2,
            Builtin::BlsG2Equal => 2,
            Builtin::BlsG2HashToGroup => 2,
            Builtin::BlsG2Compress => 1,
            Builtin::BlsG2Uncompress => 1,
            Builtin::BlsMillerLoop => 2,
            Builtin::BlsMulMlResult => 2,
            Builtin::BlsFinalVerify => 2,

            // Arrays
            Builtin::LengthOfArray => 1,
            Builtin::ListToArray => 1,
            Builtin::IndexArray => 2,
            Builtin::MultiIndexArray => 2,
        }
    }

    /// Whether the builtin does anything besides computing its result.
    pub(crate) fn has_effects(self) -> bool {
        matches!(self, Builtin::Trace)
    }

    /// Whether a saturated, well-typed application can still fail.
    pub(crate) fn can_fail(self) -> bool {
        matches!(
            self,
            Builtin::DivideInteger
                | Builtin::QuotientInteger
                | Builtin::RemainderInteger
                | Builtin::ModInteger
                | Builtin::ExpModInteger
                | Builtin::ConsByteString
                | Builtin::IndexByteString
                | Builtin::DecodeUtf8
                | Builtin::HeadList
                | Builtin::TailList
                | Builtin::UnConstrData
                | Builtin::UnMapData
                | Builtin::UnListData
                | Builtin::UnIData
                | Builtin::UnBData
                | Builtin::VerifyEd25519Signature
                | Builtin::VerifyEcdsaSecp256k1Signature
                | Builtin::VerifySchnorrSecp256k1Signature
                | Builtin::BlsG1Uncompress
                | Builtin::BlsG2Uncompress
                | Builtin::BlsG1HashToGroup
                | Builtin::BlsG2HashToGroup
                | Builtin::IntegerToByteString
                | Builtin::ReadBit
                | Builtin::WriteBits
                | Builtin::ReplicateByte
                | Builtin::IndexArray
                | Builtin::MultiIndexArray
        )
    }

    /// The canonical builtin order of the flat cost-model array for a
    /// Plutus version: alphabetical within each batch, batches appended in
    /// the order they shipped.
    pub fn cost_model_order(plutus: Plutus) -> &'static [Builtin] {
        match plutus {
            Plutus::V1 | Plutus::V2 => &COST_MODEL_ORDER[..BATCH_1_3_COUNT],
            Plutus::V3 => COST_MODEL_ORDER,
        }
    }

    /// Sizes handed to the cost functions: memory footprints, except for
    /// the handful of arguments that are costed by their literal value.
    fn argument_sizes(self, args: &[Value]) -> Vec<i64> {
        let mut sizes: Vec<i64> = args.iter().map(Value::ex_memory).collect();
        match self {
            // The requested width, in bytes.
            Builtin::IntegerToByteString => sizes[1] = literal(&args[1]),
            // The replication count, in words.
            Builtin::ReplicateByte => {
                sizes[0] = literal(&args[0]).div_euclid(8)
                    + i64::from(literal(&args[0]).rem_euclid(8) != 0)
            }
            // The number of elements dropped.
            Builtin::DropList => sizes[0] = literal(&args[0]),
            _ => {}
        }
        sizes
    }

    /// Applies the builtin function to the given arguments.
    ///
    /// The cost of the application is charged before anything is computed.
    ///
    /// # Panics
    ///
    /// Panics if the number of arguments does not match the arity of the
    /// builtin function. This is unreachable with a properly constructed
    /// CEK machine.
    pub(crate) fn apply(
        self,
        args: Vec<Value>,
        params: &cost::Parameters,
        context: &mut cost::Context,
        logger: &mut Logger,
    ) -> Result<Value, machine::Error> {
        // A builtin without cost parameters does not exist at this version.
        let costing = params
            .builtin_cost(self)
            .ok_or(machine::Error::DecodeError)?;
        let sizes = self.argument_sizes(&args);
        context.spend(
            Category::BuiltinApplication(self),
            cost::Budget::from_signed(
                costing.execution.cost(&sizes),
                costing.memory.cost(&sizes),
            ),
        )?;

        match self {
            Builtin::Trace => {
                let mut args = args.into_iter();
                let message = String::input(args.next().expect("trace has two arguments"))?;
                let value = args.next().expect("trace has two arguments");
                logger.log(message);
                Ok(value)
            }
            Builtin::ConsByteString => {
                let semantics = params.semantics;
                let mut args = args.into_iter();
                let head = rug::Integer::input(args.next().expect("cons has two arguments"))?;
                let tail = Vec::<u8>::input(args.next().expect("cons has two arguments"))?;
                bytestring::cons(semantics, head, tail).into_value()
            }
            _ => self.dispatch(args),
        }
    }

    fn dispatch(self, args: Vec<Value>) -> Result<Value, machine::Error> {
        macro_rules! call {
            ($fn:expr) => {
                BuiltinFunction::apply($fn, args)
            };
        }

        match self {
            Builtin::AddInteger => call!(integer::add),
            Builtin::SubtractInteger => call!(integer::subtract),
            Builtin::MultiplyInteger => call!(integer::multiply),
            Builtin::DivideInteger => call!(integer::divide),
            Builtin::QuotientInteger => call!(integer::quotient),
            Builtin::RemainderInteger => call!(integer::remainder),
            Builtin::ModInteger => call!(integer::modulo),
            Builtin::EqualsInteger => call!(integer::equals),
            Builtin::LessThanInteger => call!(integer::less_than),
            Builtin::LessThanEqualsInteger => call!(integer::less_than_or_equal),
            Builtin::ExpModInteger => call!(integer::exp_mod),
            Builtin::IntegerToByteString => call!(integer::to_bytes),

            Builtin::AppendByteString => call!(bytestring::append),
            Builtin::SliceByteString => call!(bytestring::slice),
            Builtin::LengthOfByteString => call!(bytestring::length),
            Builtin::IndexByteString => call!(bytestring::index),
            Builtin::EqualsByteString => call!(bytestring::equals),
            Builtin::LessThanByteString => call!(bytestring::less_than),
            Builtin::LessThanEqualsByteString => call!(bytestring::less_than_or_equal),
            Builtin::ByteStringToInteger => call!(bytestring::to_integer),
            Builtin::AndByteString => call!(bytestring::and),
            Builtin::OrByteString => call!(bytestring::or),
            Builtin::XorByteString => call!(bytestring::xor),
            Builtin::ComplementByteString => call!(bytestring::complement),
            Builtin::ReadBit => call!(bytestring::read_bit),
            Builtin::WriteBits => call!(bytestring::write_bits),
            Builtin::ReplicateByte => call!(bytestring::replicate_byte),
            Builtin::ShiftByteString => call!(bytestring::shift),
            Builtin::RotateByteString => call!(bytestring::rotate),
            Builtin::CountSetBits => call!(bytestring::count_set_bits),
            Builtin::FindFirstSetBit => call!(bytestring::first_set_bit),

            Builtin::Sha2_256 => call!(digest::digest::<sha2::Sha256>),
            Builtin::Sha3_256 => call!(digest::digest::<sha3::Sha3_256>),
            Builtin::Blake2b256 => call!(digest::digest::<blake2::Blake2b<blake2::digest::consts::U32>>),
            Builtin::Blake2b224 => call!(digest::digest::<blake2::Blake2b<blake2::digest::consts::U28>>),
            Builtin::Keccak256 => call!(digest::digest::<sha3::Keccak256>),
            Builtin::Ripemd160 => call!(digest::digest::<ripemd::Ripemd160>),
            Builtin::VerifyEd25519Signature => call!(ed25519::verify),
            Builtin::VerifyEcdsaSecp256k1Signature => call!(k256::verify_ecdsa),
            Builtin::VerifySchnorrSecp256k1Signature => call!(k256::verify_schnorr),

            Builtin::AppendString => call!(string::append),
            Builtin::EqualsString => call!(string::equals),
            Builtin::EncodeUtf8 => call!(string::encode_utf8),
            Builtin::DecodeUtf8 => call!(string::decode_utf8),

            Builtin::IfThenElse => call!(if_then_else),
            Builtin::ChooseUnit => call!(choose_unit),
            Builtin::FstPair => call!(first_pair),
            Builtin::SndPair => call!(second_pair),

            Builtin::ChooseList => call!(list::choose),
            Builtin::MkCons => call!(list::mk_cons),
            Builtin::HeadList => call!(list::head),
            Builtin::TailList => call!(list::tail),
            Builtin::NullList => call!(list::null),
            Builtin::DropList => call!(list::drop),

            Builtin::ChooseData => call!(data::choose),
            Builtin::ConstrData => call!(data::construct),
            Builtin::MapData => call!(data::map),
            Builtin::ListData => call!(data::list),
            Builtin::IData => call!(data::integer),
            Builtin::BData => call!(data::bytes),
            Builtin::UnConstrData => call!(data::un_construct),
            Builtin::UnMapData => call!(data::un_map),
            Builtin::UnListData => call!(data::un_list),
            Builtin::UnIData => call!(data::un_integer),
            Builtin::UnBData => call!(data::un_bytes),
            Builtin::EqualsData => call!(data::equals),
            Builtin::SerialiseData => call!(data::serialize),
            Builtin::MkPairData => call!(data::mk_pair),
            Builtin::MkNilData => call!(list::mk_nil),
            Builtin::MkNilPairData => call!(list::mk_nil_pair),

            Builtin::BlsG1Add => call!(bls12_381::g1_add),
            Builtin::BlsG1Neg => call!(bls12_381::g1_neg),
            Builtin::BlsG1ScalarMul => call!(bls12_381::g1_scalar_mul),
            Builtin::BlsG1Equal => call!(bls12_381::g1_equals),
            Builtin::BlsG1Compress => call!(bls12_381::g1_compress),
            Builtin::BlsG1Uncompress => call!(bls12_381::g1_uncompress),
            Builtin::BlsG1HashToGroup => call!(bls12_381::g1_hash_to_group),
            Builtin::BlsG2Add => call!(bls12_381::g2_add),
            Builtin::BlsG2Neg => call!(bls12_381::g2_neg),
            Builtin::BlsG2ScalarMul => call!(bls12_381::g2_scalar_mul),
            Builtin::BlsG2Equal => call!(bls12_381::g2_equals),
            Builtin::BlsG2Compress => call!(bls12_381::g2_compress),
            Builtin::BlsG2Uncompress => call!(bls12_381::g2_uncompress),
            Builtin::BlsG2HashToGroup => call!(bls12_381::g2_hash_to_group),
            Builtin::BlsMillerLoop => call!(bls12_381::miller_loop),
            Builtin::BlsMulMlResult => call!(bls12_381::mul_ml_result),
            Builtin::BlsFinalVerify => call!(bls12_381::final_verify),

            Builtin::LengthOfArray => call!(array::length),
            Builtin::ListToArray => call!(list::to_array),
            Builtin::IndexArray => call!(array::index),
            Builtin::MultiIndexArray => call!(array::multi_index),

            Builtin::Trace | Builtin::ConsByteString => {
                unreachable!("handled before dispatch")
            }
        }
    }
}

pub fn if_then_else(condition: bool, then: Value, otherwise: Value) -> Value {
    if condition { then } else { otherwise }
}

pub fn choose_unit(_: (), then: Value) -> Value {
    then
}

pub fn first_pair(pair: (Constant, Constant)) -> Constant {
    pair.0
}

pub fn second_pair(pair: (Constant, Constant)) -> Constant {
    pair.1
}

/// The literal integer value of an argument, saturated to the cost range.
fn literal(value: &Value) -> i64 {
    match value {
        Value::Constant(constant) => match constant.as_ref() {
            Constant::Integer(i) => i
                .to_i64()
                .unwrap_or(if i.is_negative() { i64::MIN } else { i64::MAX })
                .saturating_abs(),
            _ => 0,
        },
        _ => 0,
    }
}

/// Convert a machine value into a builtin argument.
pub(crate) trait Input: Sized {
    fn input(value: Value) -> Result<Self, machine::Error>;
}

/// Any machine value can be used as a builtin input.
impl Input for Value {
    fn input(value: Value) -> Result<Self, machine::Error> {
        Ok(value)
    }
}

impl Input for Constant {
    fn input(value: Value) -> Result<Self, machine::Error> {
        match value {
            Value::Constant(constant) => Ok(Rc::unwrap_or_clone(constant)),
            _ => Err(machine::Error::TypeMismatch),
        }
    }
}

macro_rules! impl_input {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Input for $ty {
                fn input(value: Value) -> Result<Self, machine::Error> {
                    Constant::input(value)?
                        .try_into()
                        .map_err(|()| machine::Error::TypeMismatch)
                }
            }
        )*
    };
}

impl_input!(
    rug::Integer,
    Vec<u8>,
    String,
    bool,
    (),
    crate::constant::List,
    crate::constant::Array,
    crate::Data,
    Vec<crate::Data>,
    Vec<(crate::Data, crate::Data)>,
    Vec<rug::Integer>,
    (Constant, Constant),
    ::bls12_381::G1Projective,
    ::bls12_381::G2Projective,
    ::bls12_381::MillerLoopResult,
);

/// Convert a builtin result back into a machine value.
pub(crate) trait Output {
    fn into_value(self) -> Result<Value, machine::Error>;
}

impl Output for Value {
    fn into_value(self) -> Result<Value, machine::Error> {
        Ok(self)
    }
}

impl Output for Constant {
    fn into_value(self) -> Result<Value, machine::Error> {
        Ok(Value::Constant(Rc::new(self)))
    }
}

/// Absent results are domain failures (empty head, division by zero, …).
impl<T: Output> Output for Option<T> {
    fn into_value(self) -> Result<Value, machine::Error> {
        self.ok_or(machine::Error::DomainError)?.into_value()
    }
}

impl<T: Output> Output for Result<T, machine::Error> {
    fn into_value(self) -> Result<Value, machine::Error> {
        self?.into_value()
    }
}

macro_rules! impl_output {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Output for $ty {
                fn into_value(self) -> Result<Value, machine::Error> {
                    Constant::from(self).into_value()
                }
            }
        )*
    };
}

impl_output!(
    rug::Integer,
    Vec<u8>,
    String,
    bool,
    (),
    crate::constant::List,
    crate::constant::Array,
    crate::Data,
    Vec<crate::Data>,
    Vec<(crate::Data, crate::Data)>,
    (crate::Data, crate::Data),
    (rug::Integer, Vec<crate::Data>),
    ::bls12_381::G1Projective,
    ::bls12_381::G2Projective,
    ::bls12_381::MillerLoopResult,
);

/// A builtin implementation that can be applied to a vector of values.
pub(crate) trait BuiltinFunction<I> {
    fn apply(self, args: Vec<Value>) -> Result<Value, machine::Error>;
}

/// Implement `BuiltinFunction` for implementations with varying arity.
macro_rules! impl_builtin_function {
    ($($ty:ident),*) => {
        #[allow(non_snake_case)]
        impl<O, FN, $($ty),*> BuiltinFunction<($($ty,)*)> for FN
        where
            O: Output,
            FN: Fn($($ty),*) -> O,
            $($ty: Input),*
        {
            fn apply(self, args: Vec<Value>) -> Result<Value, machine::Error> {
                let mut args = args.into_iter();
                $(
                    let $ty = $ty::input(
                        args.next().expect("correct number of arguments passed"),
                    )?;
                )*
                (self)($($ty),*).into_value()
            }
        }
    };
}

impl_builtin_function!(A);
impl_builtin_function!(A, B);
impl_builtin_function!(A, B, C);
impl_builtin_function!(A, B, C, D);
impl_builtin_function!(A, B, C, D, E);
impl_builtin_function!(A, B, C, D, E, F);

/// Number of builtins shipped before the V3 batches (BLS, bit operations,
/// arrays); this prefix is the whole V1/V2 cost-model table.
const BATCH_1_3_COUNT: usize = 54;

/// All builtins, in the canonical cost-model order: alphabetical by wire
/// name within each batch.
const COST_MODEL_ORDER: &[Builtin] = &[
    Builtin::AddInteger,
    Builtin::AppendByteString,
    Builtin::AppendString,
    Builtin::BData,
    Builtin::Blake2b256,
    Builtin::ChooseData,
    Builtin::ChooseList,
    Builtin::ChooseUnit,
    Builtin::ConsByteString,
    Builtin::ConstrData,
    Builtin::DecodeUtf8,
    Builtin::DivideInteger,
    Builtin::EncodeUtf8,
    Builtin::EqualsByteString,
    Builtin::EqualsData,
    Builtin::EqualsInteger,
    Builtin::EqualsString,
    Builtin::FstPair,
    Builtin::HeadList,
    Builtin::IData,
    Builtin::IfThenElse,
    Builtin::IndexByteString,
    Builtin::LengthOfByteString,
    Builtin::LessThanByteString,
    Builtin::LessThanEqualsByteString,
    Builtin::LessThanEqualsInteger,
    Builtin::LessThanInteger,
    Builtin::ListData,
    Builtin::MapData,
    Builtin::MkCons,
    Builtin::MkNilData,
    Builtin::MkNilPairData,
    Builtin::MkPairData,
    Builtin::ModInteger,
    Builtin::MultiplyInteger,
    Builtin::NullList,
    Builtin::QuotientInteger,
    Builtin::RemainderInteger,
    Builtin::SerialiseData,
    Builtin::Sha2_256,
    Builtin::Sha3_256,
    Builtin::SliceByteString,
    Builtin::SndPair,
    Builtin::SubtractInteger,
    Builtin::TailList,
    Builtin::Trace,
    Builtin::UnBData,
    Builtin::UnConstrData,
    Builtin::UnIData,
    Builtin::UnListData,
    Builtin::UnMapData,
    Builtin::VerifyEcdsaSecp256k1Signature,
    Builtin::VerifyEd25519Signature,
    Builtin::VerifySchnorrSecp256k1Signature,
    // Batch 4: BLS12-381, Keccak, Blake2b-224.
    Builtin::BlsG1Add,
    Builtin::BlsG1Compress,
    Builtin::BlsG1Equal,
    Builtin::BlsG1HashToGroup,
    Builtin::BlsG1Neg,
    Builtin::BlsG1ScalarMul,
    Builtin::BlsG1Uncompress,
    Builtin::BlsG2Add,
    Builtin::BlsG2Compress,
    Builtin::BlsG2Equal,
    Builtin::BlsG2HashToGroup,
    Builtin::BlsG2Neg,
    Builtin::BlsG2ScalarMul,
    Builtin::BlsG2Uncompress,
    Builtin::BlsFinalVerify,
    Builtin::BlsMillerLoop,
    Builtin::BlsMulMlResult,
    Builtin::Keccak256,
    Builtin::Blake2b224,
    // Batch 5: conversions and bit operations.
    Builtin::IntegerToByteString,
    Builtin::ByteStringToInteger,
    Builtin::AndByteString,
    Builtin::OrByteString,
    Builtin::XorByteString,
    Builtin::ComplementByteString,
    Builtin::ReadBit,
    Builtin::WriteBits,
    Builtin::ReplicateByte,
    Builtin::ShiftByteString,
    Builtin::RotateByteString,
    Builtin::CountSetBits,
    Builtin::FindFirstSetBit,
    Builtin::Ripemd160,
    // Batch 6: modular exponentiation and arrays.
    Builtin::ExpModInteger,
    Builtin::DropList,
    Builtin::LengthOfArray,
    Builtin::ListToArray,
    Builtin::IndexArray,
    Builtin::MultiIndexArray,
];

impl Builtin {
    /// The bundled cost functions: the shapes are fixed per builtin, the
    /// parameters here are the defaults used when the caller supplies none.
    pub(crate) fn default_cost(self) -> Pair {
        use Function::*;

        let pair = |execution: Function, memory: Function| Pair { execution, memory };
        let constant = |c: i64, m: i64| pair(Constant(c), Constant(m));

        match self {
            Builtin::AddInteger | Builtin::SubtractInteger => pair(
                MaxSize { intercept: 100_788, slope: 420 },
                MaxSize { intercept: 1, slope: 1 },
            ),
            Builtin::MultiplyInteger => pair(
                MultipliedSizes { intercept: 90_434, slope: 519 },
                AddedSizes { intercept: 0, slope: 1 },
            ),
            Builtin::DivideInteger | Builtin::QuotientInteger => pair(
                ConstAboveDiagonal {
                    constant: 196_500,
                    model: Box::new(MultipliedSizes { intercept: 453_240, slope: 220 }),
                },
                SubtractedSizes { intercept: 0, slope: 1, minimum: 1 },
            ),
            Builtin::ModInteger | Builtin::RemainderInteger => pair(
                ConstAboveDiagonal {
                    constant: 196_500,
                    model: Box::new(MultipliedSizes { intercept: 453_240, slope: 220 }),
                },
                LinearInY { intercept: 0, slope: 1 },
            ),
            Builtin::EqualsInteger => pair(
                MaxSize { intercept: 51_775, slope: 558 },
                Constant(1),
            ),
            Builtin::LessThanInteger | Builtin::LessThanEqualsInteger => pair(
                MinSize { intercept: 44_749, slope: 541 },
                Constant(1),
            ),
            Builtin::ExpModInteger => pair(
                LinearInYAndZ { intercept: 607_153, slope_y: 7_563, slope_z: 15_126 },
                LinearInZ { intercept: 0, slope: 1 },
            ),

            Builtin::AppendByteString => pair(
                AddedSizes { intercept: 1_000, slope: 571 },
                AddedSizes { intercept: 0, slope: 1 },
            ),
            Builtin::ConsByteString => pair(
                LinearInY { intercept: 221_973, slope: 511 },
                AddedSizes { intercept: 0, slope: 1 },
            ),
            Builtin::SliceByteString => pair(
                LinearInZ { intercept: 265_318, slope: 0 },
                LinearInZ { intercept: 4, slope: 0 },
            ),
            Builtin::LengthOfByteString => constant(1_000, 10),
            Builtin::IndexByteString => constant(57_667, 4),
            Builtin::EqualsByteString => pair(
                LinearOnDiagonal { constant: 245_000, intercept: 216_773, slope: 62 },
                Constant(1),
            ),
            Builtin::LessThanByteString | Builtin::LessThanEqualsByteString => pair(
                MinSize { intercept: 197_145, slope: 156 },
                Constant(1),
            ),
            Builtin::ByteStringToInteger => pair(
                QuadraticInY { c0: 1_006_041, c1: 43_623, c2: 251 },
                LinearInY { intercept: 0, slope: 1 },
            ),
            Builtin::IntegerToByteString => pair(
                QuadraticInZ { c0: 1_293_828, c1: 28_716, c2: 63 },
                LiteralInYOrLinearInZ { intercept: 0, slope: 1 },
            ),
            Builtin::AndByteString | Builtin::OrByteString | Builtin::XorByteString => pair(
                LinearInYAndZ { intercept: 100_181, slope_y: 726, slope_z: 719 },
                LinearInMaxYZ { intercept: 0, slope: 1 },
            ),
            Builtin::ComplementByteString => pair(
                LinearInX { intercept: 107_878, slope: 680 },
                LinearInX { intercept: 0, slope: 1 },
            ),
            Builtin::ReadBit => constant(95_336, 1),
            Builtin::WriteBits => pair(
                LinearInY { intercept: 281_145, slope: 18_848 },
                LinearInX { intercept: 0, slope: 1 },
            ),
            Builtin::ReplicateByte => pair(
                LinearInX { intercept: 180_194, slope: 159 },
                LinearInX { intercept: 1, slope: 1 },
            ),
            Builtin::ShiftByteString | Builtin::RotateByteString => pair(
                LinearInX { intercept: 158_519, slope: 8_942 },
                LinearInX { intercept: 0, slope: 1 },
            ),
            Builtin::CountSetBits | Builtin::FindFirstSetBit => pair(
                LinearInX { intercept: 107_490, slope: 3_298 },
                Constant(1),
            ),

            Builtin::Sha2_256 => pair(
                LinearInX { intercept: 806_990, slope: 30_482 },
                Constant(4),
            ),
            Builtin::Sha3_256 => pair(
                LinearInX { intercept: 1_927_926, slope: 82_523 },
                Constant(4),
            ),
            Builtin::Blake2b256 => pair(
                LinearInX { intercept: 1_003_750, slope: 31_220 },
                Constant(4),
            ),
            Builtin::Blake2b224 => pair(
                LinearInX { intercept: 1_003_750, slope: 31_220 },
                Constant(4),
            ),
            Builtin::Keccak256 => pair(
                LinearInX { intercept: 2_158_135, slope: 25_029 },
                Constant(4),
            ),
            Builtin::Ripemd160 => pair(
                LinearInX { intercept: 1_964_219, slope: 24_520 },
                Constant(3),
            ),
            Builtin::VerifyEd25519Signature => pair(
                LinearInY { intercept: 57_996_947, slope: 18_975 },
                Constant(10),
            ),
            Builtin::VerifyEcdsaSecp256k1Signature => constant(35_892_428, 10),
            Builtin::VerifySchnorrSecp256k1Signature => pair(
                LinearInY { intercept: 38_887_044, slope: 32_947 },
                Constant(10),
            ),

            Builtin::AppendString => pair(
                AddedSizes { intercept: 1_000, slope: 24_177 },
                AddedSizes { intercept: 4, slope: 1 },
            ),
            Builtin::EqualsString => pair(
                LinearOnDiagonal { constant: 187_000, intercept: 1_000, slope: 52_998 },
                Constant(1),
            ),
            Builtin::EncodeUtf8 => pair(
                LinearInX { intercept: 1_000, slope: 28_662 },
                LinearInX { intercept: 4, slope: 2 },
            ),
            Builtin::DecodeUtf8 => pair(
                LinearInX { intercept: 497_525, slope: 14_068 },
                LinearInX { intercept: 4, slope: 2 },
            ),

            Builtin::IfThenElse => constant(80_556, 1),
            Builtin::ChooseUnit => constant(46_417, 4),
            Builtin::Trace => constant(212_342, 32),
            Builtin::FstPair | Builtin::SndPair => constant(80_436, 32),

            Builtin::ChooseList => constant(175_354, 32),
            Builtin::MkCons => constant(65_493, 32),
            Builtin::HeadList | Builtin::TailList => constant(43_249, 32),
            Builtin::NullList => constant(60_091, 32),
            Builtin::DropList => pair(
                LinearInX { intercept: 172_000, slope: 1_176 },
                Constant(32),
            ),

            Builtin::ChooseData => constant(19_537, 32),
            Builtin::ConstrData => constant(89_141, 32),
            Builtin::MapData => constant(64_832, 32),
            Builtin::ListData => constant(52_467, 32),
            Builtin::IData => constant(1_000, 32),
            Builtin::BData => constant(1_000, 32),
            Builtin::UnConstrData => constant(32_696, 32),
            Builtin::UnMapData => constant(38_314, 32),
            Builtin::UnListData => constant(32_247, 32),
            Builtin::UnIData => constant(43_357, 32),
            Builtin::UnBData => constant(31_220, 32),
            Builtin::EqualsData => pair(
                MinSize { intercept: 1_060_367, slope: 12_586 },
                Constant(1),
            ),
            Builtin::SerialiseData => pair(
                LinearInX { intercept: 1_159_724, slope: 392_670 },
                LinearInX { intercept: 0, slope: 2 },
            ),
            Builtin::MkPairData => constant(76_511, 32),
            Builtin::MkNilData | Builtin::MkNilPairData => constant(22_558, 32),

            Builtin::BlsG1Add => constant(962_335, 18),
            Builtin::BlsG1Neg => constant(267_929, 18),
            Builtin::BlsG1ScalarMul => pair(
                LinearInX { intercept: 76_433_006, slope: 8_868 },
                Constant(18),
            ),
            Builtin::BlsG1Equal => constant(442_008, 1),
            Builtin::BlsG1Compress => constant(2_780_678, 6),
            Builtin::BlsG1Uncompress => constant(52_948_122, 18),
            Builtin::BlsG1HashToGroup => pair(
                LinearInX { intercept: 52_538_055, slope: 3_756 },
                Constant(18),
            ),
            Builtin::BlsG2Add => constant(1_995_836, 36),
            Builtin::BlsG2Neg => constant(284_546, 36),
            Builtin::BlsG2ScalarMul => pair(
                LinearInX { intercept: 158_221_314, slope: 26_549 },
                Constant(36),
            ),
            Builtin::BlsG2Equal => constant(901_022, 1),
            Builtin::BlsG2Compress => constant(3_227_919, 12),
            Builtin::BlsG2Uncompress => constant(74_698_472, 36),
            Builtin::BlsG2HashToGroup => pair(
                LinearInX { intercept: 166_917_843, slope: 4_307 },
                Constant(36),
            ),
            Builtin::BlsMillerLoop => constant(254_006_273, 72),
            Builtin::BlsMulMlResult => constant(2_174_038, 72),
            Builtin::BlsFinalVerify => constant(333_849_714, 1),

            Builtin::LengthOfArray => constant(99_532, 10),
            Builtin::ListToArray => pair(
                LinearInX { intercept: 94_607, slope: 1_343 },
                LinearInX { intercept: 0, slope: 1 },
            ),
            Builtin::IndexArray => constant(87_745, 32),
            Builtin::MultiIndexArray => pair(
                LinearInX { intercept: 98_038, slope: 1_994 },
                LinearInX { intercept: 0, slope: 1 },
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn wire_names_roundtrip() {
        assert_eq!(Builtin::from_str("addInteger"), Ok(Builtin::AddInteger));
        assert_eq!(Builtin::from_str("sha2_256"), Ok(Builtin::Sha2_256));
        assert_eq!(
            Builtin::from_str("bls12_381_G1_scalarMul"),
            Ok(Builtin::BlsG1ScalarMul)
        );
        assert_eq!(
            Builtin::from_str("multiIndexArray"),
            Ok(Builtin::MultiIndexArray)
        );
        assert!(Builtin::from_str("notABuiltin").is_err());
    }

    #[test]
    fn wire_tags_are_stable() {
        assert_eq!(Builtin::from_repr(0), Some(Builtin::AddInteger));
        assert_eq!(Builtin::from_repr(28), Some(Builtin::Trace));
        assert_eq!(Builtin::from_repr(51), Some(Builtin::SerialiseData));
        assert_eq!(Builtin::from_repr(54), Some(Builtin::BlsG1Add));
        assert_eq!(Builtin::from_repr(71), Some(Builtin::Keccak256));
        assert_eq!(Builtin::from_repr(87), Some(Builtin::ExpModInteger));
        assert_eq!(Builtin::from_repr(92), None);
    }

    #[test]
    fn every_builtin_has_cost_parameters_at_v3() {
        for builtin in Builtin::cost_model_order(Plutus::V3) {
            // Shape construction must not panic, and parameters roundtrip.
            let mut out = Vec::new();
            builtin.default_cost().push_parameters(&mut out);
            assert!(!out.is_empty(), "{builtin:?}");
        }
        assert_eq!(Builtin::cost_model_order(Plutus::V1).len(), 54);
    }
}
