//! Beta-reduction, inlining, and dead-code elimination.
//!
//! Four local rules, applied bottom-up until none fires:
//! - `force (delay t)` collapses to `t`;
//! - `(λx. x) a` collapses to `a`;
//! - `(λx. body) a` with `x` unused and `a` pure drops the argument;
//! - `(λx. body) a` substitutes `a` when the policy accepts it.
//!
//! The default policy inlines variables, builtins, and any constant whose
//! flat encoding fits 64 bits or that occurs exactly once.

use std::rc::Rc;

use crate::{
    flat,
    optimize::{is_pure, map_children},
    term::{self, Term},
};

pub fn run(term: &Rc<Term>) -> Rc<Term> {
    rewrite(term)
}

fn rewrite(term: &Rc<Term>) -> Rc<Term> {
    let mut current = map_children(term, &mut |child| rewrite(child));
    while let Some(next) = reduce(&current) {
        current = next;
    }
    current
}

/// One step of reduction at the root of `term`, if any rule applies.
///
/// Substituted arguments are always variables, builtins, or constants, so
/// a step never creates a redex deeper in the tree; re-checking the root
/// is enough.
fn reduce(term: &Rc<Term>) -> Option<Rc<Term>> {
    match term.as_ref() {
        Term::Force(inner) => match inner.as_ref() {
            Term::Delay(body) => Some(Rc::clone(body)),
            _ => None,
        },
        Term::Application { function, argument } => {
            let Term::Lambda { body, .. } = function.as_ref() else {
                return None;
            };
            if matches!(body.as_ref(), Term::Variable(binding) if binding.index.0 == 1) {
                return Some(Rc::clone(argument));
            }
            let count = body.occurrences(1);
            if count == 0 && is_pure(argument) {
                return Some(term::unshift(body, 1));
            }
            if should_inline(count, argument) {
                return Some(term::substitute(body, argument));
            }
            None
        }
        _ => None,
    }
}

fn should_inline(count: usize, argument: &Rc<Term>) -> bool {
    match argument.as_ref() {
        Term::Variable(_) | Term::Builtin(_) => true,
        Term::Constant(constant) => count == 1 || flat::constant_bit_size(constant) <= 64,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Builtin, Constant};

    #[test]
    fn collapses_forced_delays() {
        let term = Rc::new(Term::integer(42).delay().force());
        assert_eq!(*run(&term), Term::integer(42));
    }

    #[test]
    fn eliminates_identity_applications() {
        // (\x -> x) E keeps E even when E is impure.
        let term = Rc::new(Term::lambda("x", Term::var("x", 1)).apply(Term::Error));
        assert_eq!(*run(&term), Term::Error);
    }

    #[test]
    fn drops_unused_pure_arguments() {
        let term = Rc::new(Term::lambda("x", Term::integer(7)).apply(Term::var("slow", 1)));
        assert_eq!(*run(&term), Term::integer(7));
    }

    #[test]
    fn keeps_unused_impure_arguments() {
        let term = Rc::new(Term::lambda("x", Term::integer(7)).apply(Term::Error));
        assert_eq!(run(&term), term);
    }

    #[test]
    fn substitutes_small_constants() {
        // (\x -> addInteger x x) 5
        let term = Rc::new(
            Term::lambda(
                "x",
                Term::builtin(Builtin::AddInteger)
                    .apply(Term::var("x", 1))
                    .apply(Term::var("x", 1)),
            )
            .apply(Term::integer(5)),
        );
        assert_eq!(
            *run(&term),
            Term::builtin(Builtin::AddInteger)
                .apply(Term::integer(5))
                .apply(Term::integer(5))
        );
    }

    #[test]
    fn keeps_large_repeated_constants() {
        let big = Constant::Bytes(vec![0xff; 64]);
        let term = Rc::new(
            Term::lambda(
                "x",
                Term::builtin(Builtin::AppendByteString)
                    .apply(Term::var("x", 1))
                    .apply(Term::var("x", 1)),
            )
            .apply(Term::constant(big)),
        );
        assert_eq!(run(&term), term);
    }

    #[test]
    fn cascades_through_inlined_variables() {
        // (\f -> (\g -> g 1) f) h: inlining f, then g, leaves h 1.
        let term = Rc::new(
            Term::lambda(
                "f",
                Term::lambda("g", Term::var("g", 1).apply(Term::integer(1)))
                    .apply(Term::var("f", 1)),
            )
            .apply(Term::var("h", 1)),
        );
        assert_eq!(*run(&term), Term::var("h", 1).apply(Term::integer(1)));
    }

    #[test]
    fn idempotent_on_a_mixed_program() {
        let term = Rc::new(
            Term::lambda(
                "x",
                Term::integer(1).delay().force().apply(Term::var("x", 1)),
            )
            .apply(Term::Error),
        );
        let once = run(&term);
        assert_eq!(run(&once), once);
    }
}
