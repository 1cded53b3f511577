//! Whole programs: the version header, the textual syntax, the on-chain
//! envelope, and the evaluation entry points.

use std::{rc::Rc, str::FromStr};

use blake2::Digest;

use crate::{
    Builtin, Constant, DeBruijn, Version,
    constant,
    cost::{self, Parameters, Plutus},
    flat, lex,
    machine::{self, Logger, Outcome},
    optimize::Pipeline,
    term::{Binding, Term},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub version: Version,
    pub term: Rc<Term>,
}

impl Program {
    pub fn new(version: Version, term: Term) -> Program {
        Program {
            version,
            term: Rc::new(term),
        }
    }

    /// Apply the program to one more argument term, as validators are
    /// applied to their datum, redeemer, and context.
    pub fn apply_term(&self, argument: Term) -> Program {
        Program {
            version: self.version,
            term: Rc::new(Term::Application {
                function: Rc::clone(&self.term),
                argument: Rc::new(argument),
            }),
        }
    }

    /// Apply the program to a `Data` argument.
    pub fn apply_data(&self, data: crate::Data) -> Program {
        self.apply_term(Term::constant(Constant::Data(data)))
    }

    /// Run the machine on the program as-is.
    pub fn run(&self, params: &Parameters) -> Outcome {
        let mut context = cost::Context::new(params.limit);
        let mut logger = Logger::default();
        let result = machine::run(&self.term, params, &mut context, &mut logger).map(|value| {
            Program {
                version: self.version,
                term: Rc::new(value.discharge()),
            }
        });
        Outcome {
            result,
            budget: context.spent(),
            costs: context.into_tally(),
            logs: logger.drain(),
        }
    }

    /// Apply the optimization pipeline for `plutus`.
    pub fn optimize(&self, plutus: Plutus) -> Program {
        let pipeline =
            Pipeline::for_version(plutus).compact_datatypes(self.version.has_datatypes());
        Program {
            version: self.version,
            term: pipeline.run(&self.term),
        }
    }

    /// Optimize, then evaluate; the error of a failed evaluation is
    /// returned as-is.
    pub fn evaluate(&self, params: &Parameters) -> Result<Program, machine::Error> {
        self.optimize(params.plutus).run(params).result
    }

    /// Optimize, then evaluate, reporting the outcome, spent budget, cost
    /// breakdown, and logs. Never panics.
    pub fn evaluate_debug(&self, params: &Parameters) -> Outcome {
        self.optimize(params.plutus).run(params)
    }

    /// Wrap the flat encoding in a CBOR byte string, as scripts are carried
    /// by the ledger.
    pub fn to_cbor(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut encoder = minicbor::Encoder::new(&mut out);
        encoder
            .bytes(&self.to_flat())
            .expect("writing to a vector does not fail");
        out
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Program, DecodeError> {
        let mut decoder = minicbor::Decoder::new(bytes);
        let inner = decoder.bytes().map_err(|_| DecodeError::Envelope)?;
        if decoder.position() != bytes.len() {
            return Err(DecodeError::Envelope);
        }
        Ok(Program::from_flat(inner)?)
    }

    /// The hex form of [`Program::to_cbor`].
    pub fn to_hex(&self) -> String {
        const_hex::encode(self.to_cbor())
    }

    pub fn from_hex(hex: &str) -> Result<Program, DecodeError> {
        let bytes = const_hex::decode(hex.trim()).map_err(|_| DecodeError::Hex)?;
        Program::from_cbor(&bytes)
    }

    /// The script hash: blake2b-224 over the language tag byte followed by
    /// the flat-encoded program.
    pub fn hash(&self, plutus: Plutus) -> [u8; 28] {
        let mut hasher = blake2::Blake2b::<blake2::digest::consts::U28>::new();
        hasher.update([plutus.language_tag()]);
        hasher.update(self.to_flat());
        hasher.finalize().into()
    }
}

/// A failure while unwrapping the program envelope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid hex")]
    Hex,
    #[error("invalid CBOR envelope")]
    Envelope,
    #[error(transparent)]
    Flat(#[from] flat::Error),
}

/// A failure while parsing the textual syntax.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("malformed program syntax")]
    Syntax,
    #[error("unsupported program version")]
    Version,
    #[error("unknown builtin name")]
    UnknownBuiltin,
    #[error("unknown keyword `{0}`")]
    UnknownKeyword(String),
    #[error("variable `{0}` is not in scope")]
    FreeVariable(String),
    #[error("invalid constant: {0}")]
    Constant(#[from] constant::ParseError),
}

impl FromStr for Program {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (content, rest) =
            lex::group::<b'(', b')'>(s.trim()).ok_or(ParseError::Syntax)?;
        if !rest.is_empty() {
            return Err(ParseError::Syntax);
        }
        let content = content
            .strip_prefix("program")
            .ok_or(ParseError::Syntax)?
            .trim_start();
        let (version_str, term_str) = lex::word(content);
        let version: Version = version_str.parse().map_err(|()| ParseError::Version)?;
        if version.major != 1 || version.minor > 1 || version.patch != 0 {
            return Err(ParseError::Version);
        }

        let mut scope = Vec::new();
        let (term, rest) = parse_term(term_str, &version, &mut scope)?;
        if !rest.is_empty() {
            return Err(ParseError::Syntax);
        }
        Ok(Program { version, term })
    }
}

fn parse_term<'a>(
    s: &'a str,
    version: &Version,
    scope: &mut Vec<Rc<str>>,
) -> Result<(Rc<Term>, &'a str), ParseError> {
    if s.starts_with('(') {
        let (content, rest) = lex::group::<b'(', b')'>(s).ok_or(ParseError::Syntax)?;
        let (keyword, tail) = lex::word(content);
        let term = match keyword {
            "lam" => {
                let (name, body_str) = lex::word(tail);
                if name.is_empty() {
                    return Err(ParseError::Syntax);
                }
                let parameter: Rc<str> = Rc::from(name);
                scope.push(Rc::clone(&parameter));
                let result = parse_whole_term(body_str, version, scope);
                scope.pop();
                Term::Lambda {
                    parameter,
                    body: result?,
                }
            }
            "delay" => Term::Delay(parse_whole_term(tail, version, scope)?),
            "force" => Term::Force(parse_whole_term(tail, version, scope)?),
            "error" => {
                if !tail.is_empty() {
                    return Err(ParseError::Syntax);
                }
                Term::Error
            }
            "con" => Term::Constant(Rc::new(Constant::parse(tail)?)),
            "builtin" => {
                let (name, after) = lex::word(tail);
                if !after.is_empty() {
                    return Err(ParseError::Syntax);
                }
                Term::Builtin(Builtin::from_str(name).map_err(|_| ParseError::UnknownBuiltin)?)
            }
            "constr" if version.has_datatypes() => {
                let (tag_str, mut fields_str) = lex::word(tail);
                let tag = tag_str.parse().map_err(|_| ParseError::Syntax)?;
                let mut fields = Vec::new();
                while !fields_str.is_empty() {
                    let (field, rest) = parse_term(fields_str, version, scope)?;
                    fields.push(field);
                    fields_str = rest;
                }
                Term::Construct { tag, fields }
            }
            "case" if version.has_datatypes() => {
                let (scrutinee, mut branches_str) = parse_term(tail, version, scope)?;
                let mut branches = Vec::new();
                while !branches_str.is_empty() {
                    let (branch, rest) = parse_term(branches_str, version, scope)?;
                    branches.push(branch);
                    branches_str = rest;
                }
                Term::Case {
                    scrutinee,
                    branches,
                }
            }
            other => return Err(ParseError::UnknownKeyword(other.to_string())),
        };
        Ok((Rc::new(term), rest))
    } else if s.starts_with('[') {
        let (content, rest) = lex::group::<b'[', b']'>(s).ok_or(ParseError::Syntax)?;
        let (function, mut args_str) = parse_term(content, version, scope)?;
        if args_str.is_empty() {
            return Err(ParseError::Syntax);
        }
        let mut term = function;
        while !args_str.is_empty() {
            let (argument, next) = parse_term(args_str, version, scope)?;
            args_str = next;
            term = Rc::new(Term::Application {
                function: term,
                argument,
            });
        }
        Ok((term, rest))
    } else {
        let (name, rest) = lex::word(s);
        if name.is_empty() {
            return Err(ParseError::Syntax);
        }
        let position = scope
            .iter()
            .rposition(|bound| &**bound == name)
            .ok_or_else(|| ParseError::FreeVariable(name.to_string()))?;
        let index = (scope.len() - position) as u32;
        Ok((
            Rc::new(Term::Variable(Binding {
                name: Rc::from(name),
                index: DeBruijn(index),
            })),
            rest,
        ))
    }
}

/// Parse a term that must consume all of `s`.
fn parse_whole_term(
    s: &str,
    version: &Version,
    scope: &mut Vec<Rc<str>>,
) -> Result<Rc<Term>, ParseError> {
    let (term, rest) = parse_term(s, version, scope)?;
    if !rest.is_empty() {
        return Err(ParseError::Syntax);
    }
    Ok(term)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_de_bruijn_indices() {
        let program: Program = "(program 1.0.0 (lam x (lam y [x y])))".parse().unwrap();
        assert_eq!(
            *program.term,
            Term::lambda(
                "x",
                Term::lambda("y", Term::var("x", 2).apply(Term::var("y", 1))),
            )
        );
    }

    #[test]
    fn rejects_free_variables() {
        let result: Result<Program, _> = "(program 1.0.0 (lam x y))".parse();
        assert_eq!(result, Err(ParseError::FreeVariable("y".into())));
    }

    #[test]
    fn rejects_unknown_versions() {
        let result: Result<Program, _> = "(program 2.0.0 (con unit ()))".parse();
        assert_eq!(result, Err(ParseError::Version));
        let result: Result<Program, _> = "(program 1.0.0 (constr 0))".parse();
        assert_eq!(result, Err(ParseError::UnknownKeyword("constr".into())));
    }

    #[test]
    fn parses_datatype_forms() {
        let program: Program = "(program 1.1.0 (case (constr 1 (con integer 5)) (lam x x) (lam x x)))"
            .parse()
            .unwrap();
        let Term::Case {
            scrutinee,
            branches,
        } = &*program.term
        else {
            panic!("expected a case term");
        };
        assert_eq!(branches.len(), 2);
        let Term::Construct { tag: 1, fields } = scrutinee.as_ref() else {
            panic!("expected a constr scrutinee");
        };
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn flat_roundtrip_through_the_envelope() {
        let program: Program =
            "(program 1.1.0 [(lam x [(builtin addInteger) x (con integer 1)]) (con integer 2)])"
                .parse()
                .unwrap();
        let hex = program.to_hex();
        let decoded = Program::from_hex(&hex).unwrap();
        assert_eq!(decoded, program);
    }

    #[test]
    fn constants_roundtrip_through_flat() {
        for source in [
            "(con integer -123456789012345678901234567890)",
            "(con bytestring #00ff10)",
            "(con string \"hello\")",
            "(con bool True)",
            "(con unit ())",
            "(con (list integer) [1, 2, 3])",
            "(con (list integer) [])",
            "(con (pair integer (list bool)) (1, [True]))",
            "(con data (Constr 3 [I 1, B #ff, Map [(I 1, I 2)], List []]))",
        ] {
            let program: Program = format!("(program 1.0.0 {source})").parse().unwrap();
            let bytes = program.to_flat();
            assert_eq!(Program::from_flat(&bytes).unwrap(), program, "{source}");
        }
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(Program::from_flat(&[]).is_err());
        assert!(Program::from_hex("zz").is_err());
        // Version 2.0.0.
        let mut bad = Program::from_str("(program 1.0.0 (con unit ()))")
            .unwrap()
            .to_flat();
        bad[0] = 2;
        assert_eq!(Program::from_flat(&bad), Err(flat::Error::UnknownVersion.into()));
    }

    #[test]
    fn script_hashes_are_stable() {
        let program: Program = "(program 1.0.0 (con unit ()))".parse().unwrap();
        let v1 = program.hash(Plutus::V1);
        let v2 = program.hash(Plutus::V2);
        assert_ne!(v1, v2);
        assert_eq!(v1, program.hash(Plutus::V1));
    }
}
