//! Term rewrites that preserve observational behavior under the machine.
//!
//! Every pass maps a term to an equivalent term: same final value, same
//! failure kind, and the same trace log, for every closed program. Budgets
//! are allowed to change; that is the point.

use std::{collections::BTreeSet, rc::Rc};

use crate::{Builtin, cost::Plutus, term::Term};

pub mod case_constr;
pub mod eta;
pub mod forced_builtin;
pub mod inline;
pub mod strict_if;

/// The fixed pass order for one Plutus version.
#[derive(Debug, Clone)]
pub struct Pipeline {
    compact_datatypes: bool,
    extraction_exceptions: BTreeSet<Builtin>,
}

impl Pipeline {
    pub fn for_version(plutus: Plutus) -> Pipeline {
        Pipeline {
            compact_datatypes: plutus == Plutus::V3,
            extraction_exceptions: BTreeSet::new(),
        }
    }

    /// Disable forced-builtin extraction for one builtin.
    pub fn without_extracting(mut self, builtin: Builtin) -> Pipeline {
        self.extraction_exceptions.insert(builtin);
        self
    }

    /// Restrict the `case`/`constr` compaction, e.g. for a program whose
    /// own version predates those forms.
    pub(crate) fn compact_datatypes(mut self, allowed: bool) -> Pipeline {
        self.compact_datatypes &= allowed;
        self
    }

    pub fn run(&self, term: &Rc<Term>) -> Rc<Term> {
        let mut term = Rc::clone(term);
        for round in 0..3 {
            term = eta::run(&term);
            term = inline::run(&term);
            log::debug!("finished eta/inline round {round}");
        }
        term = strict_if::run(&term);
        term = forced_builtin::run(&term, &self.extraction_exceptions);
        if self.compact_datatypes {
            term = case_constr::run(&term);
        }
        term
    }
}

/// Whether evaluating the term can neither fail, diverge, nor log.
///
/// Values are pure; a forced delay is as pure as its body; forcing a
/// builtin that still expects a quantifier is pure; a saturated
/// application of an effect-free, failure-free builtin to pure arguments
/// is pure. Everything else is treated as impure, including unsaturated
/// builtin applications.
pub(crate) fn is_pure(term: &Term) -> bool {
    match term {
        Term::Variable(_)
        | Term::Lambda { .. }
        | Term::Delay(_)
        | Term::Constant(_)
        | Term::Builtin(_) => true,
        Term::Error => false,
        Term::Force(inner) => match inner.as_ref() {
            Term::Delay(body) => is_pure(body),
            _ => {
                let (head, forces, args) = spine(term);
                match head {
                    Term::Builtin(builtin) => args.is_empty() && forces <= builtin.quantifiers(),
                    _ => false,
                }
            }
        },
        Term::Construct { fields, .. } => fields.iter().all(|f| is_pure(f)),
        Term::Case { .. } => false,
        Term::Application { .. } => {
            let (head, forces, args) = spine(term);
            match head {
                Term::Builtin(builtin) => {
                    forces == builtin.quantifiers()
                        && args.len() == builtin.arity() as usize
                        && !builtin.has_effects()
                        && !builtin.can_fail()
                        && args.iter().all(|a| is_pure(a))
                }
                _ => false,
            }
        }
    }
}

/// Rebuild a node with every direct child passed through `f`.
pub(crate) fn map_children(
    term: &Rc<Term>,
    f: &mut impl FnMut(&Rc<Term>) -> Rc<Term>,
) -> Rc<Term> {
    match term.as_ref() {
        Term::Variable(_) | Term::Constant(_) | Term::Builtin(_) | Term::Error => Rc::clone(term),
        Term::Lambda { parameter, body } => Rc::new(Term::Lambda {
            parameter: Rc::clone(parameter),
            body: f(body),
        }),
        Term::Application { function, argument } => Rc::new(Term::Application {
            function: f(function),
            argument: f(argument),
        }),
        Term::Delay(body) => Rc::new(Term::Delay(f(body))),
        Term::Force(body) => Rc::new(Term::Force(f(body))),
        Term::Construct { tag, fields } => Rc::new(Term::Construct {
            tag: *tag,
            fields: fields.iter().map(|field| f(field)).collect(),
        }),
        Term::Case {
            scrutinee,
            branches,
        } => Rc::new(Term::Case {
            scrutinee: f(scrutinee),
            branches: branches.iter().map(|branch| f(branch)).collect(),
        }),
    }
}

/// Decompose `force^f (head) a1 … an` into its parts. Arguments come back
/// in application order.
pub(crate) fn spine(term: &Term) -> (&Term, u8, Vec<&Rc<Term>>) {
    let mut args = Vec::new();
    let mut current = term;
    while let Term::Application { function, argument } = current {
        args.push(argument);
        current = function;
    }
    args.reverse();
    let mut forces = 0u8;
    while let Term::Force(inner) = current {
        forces = forces.saturating_add(1);
        current = inner;
    }
    (current, forces, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Constant;

    #[test]
    fn purity() {
        assert!(is_pure(&Term::integer(1)));
        assert!(is_pure(&Term::lambda("x", Term::Error)));
        assert!(is_pure(&Term::builtin(Builtin::Trace)));
        assert!(is_pure(&Term::integer(1).delay()));
        assert!(is_pure(&Term::integer(1).delay().force()));
        assert!(is_pure(&Term::builtin(Builtin::HeadList).force()));

        // Saturated application of a total builtin to constants.
        assert!(is_pure(
            &Term::builtin(Builtin::AddInteger)
                .apply(Term::integer(1))
                .apply(Term::integer(2))
        ));
        // Unsaturated application.
        assert!(!is_pure(
            &Term::builtin(Builtin::AddInteger).apply(Term::integer(1))
        ));
        // A builtin that can fail.
        assert!(!is_pure(
            &Term::builtin(Builtin::DivideInteger)
                .apply(Term::integer(1))
                .apply(Term::integer(0))
        ));
        // A builtin with an effect.
        assert!(!is_pure(
            &Term::builtin(Builtin::Trace)
                .force()
                .apply(Term::constant(Constant::String("hi".into())))
                .apply(Term::integer(1))
        ));
        assert!(!is_pure(&Term::Error));
    }

    #[test]
    fn spines() {
        let term = Term::builtin(Builtin::IfThenElse)
            .force()
            .apply(Term::boolean(true))
            .apply(Term::integer(1))
            .apply(Term::integer(2));
        let (head, forces, args) = spine(&term);
        assert_eq!(head, &Term::builtin(Builtin::IfThenElse));
        assert_eq!(forces, 1);
        assert_eq!(args.len(), 3);
        assert_eq!(*args[0].as_ref(), Term::boolean(true));
    }
}
