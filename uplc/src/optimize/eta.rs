//! Eta-reduction: `λx. f x` becomes `f`.
//!
//! The rewrite requires that `x` does not occur in `f` and that `f` is
//! pure, so that evaluating `f` eagerly (instead of capturing it under the
//! lambda) cannot fail or log.

use std::rc::Rc;

use crate::{
    term::{self, Term},
    optimize::{is_pure, map_children},
};

pub fn run(term: &Rc<Term>) -> Rc<Term> {
    rewrite(term)
}

fn rewrite(term: &Rc<Term>) -> Rc<Term> {
    let rebuilt = map_children(term, &mut |child| rewrite(child));
    if let Term::Lambda { body, .. } = rebuilt.as_ref()
        && let Term::Application { function, argument } = body.as_ref()
        && matches!(argument.as_ref(), Term::Variable(binding) if binding.index.0 == 1)
        && !function.mentions(1)
        && is_pure(function)
    {
        // The binder disappears; the remaining free variables step down.
        return rewrite(&term::unshift(function, 0));
    }
    rebuilt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Builtin;

    #[test]
    fn reduces_a_builtin_wrapper() {
        // \x -> addInteger x  ==>  addInteger
        let term = Rc::new(Term::lambda(
            "x",
            Term::builtin(Builtin::AddInteger).apply(Term::var("x", 1)),
        ));
        assert_eq!(*run(&term), Term::builtin(Builtin::AddInteger));
    }

    #[test]
    fn reduces_nested_wrappers() {
        // \x -> (\y -> f y) x with f free: both lambdas go.
        let term = Rc::new(Term::lambda(
            "x",
            Term::lambda("y", Term::var("f", 3).apply(Term::var("y", 1)))
                .apply(Term::var("x", 1)),
        ));
        assert_eq!(*run(&term), Term::var("f", 1));
    }

    #[test]
    fn keeps_used_binders() {
        // \x -> x x is not an eta-redex.
        let term = Rc::new(Term::lambda(
            "x",
            Term::var("x", 1).apply(Term::var("x", 1)),
        ));
        assert_eq!(run(&term), term);
    }

    #[test]
    fn keeps_impure_functions() {
        // \x -> (error) x must stay: evaluating the function eagerly would
        // fail even when the lambda is never applied.
        let term = Rc::new(Term::lambda("x", Term::Error.apply(Term::var("x", 1))));
        assert_eq!(run(&term), term);
    }

    #[test]
    fn idempotent() {
        let term = Rc::new(Term::lambda(
            "x",
            Term::builtin(Builtin::AddInteger).apply(Term::var("x", 1)),
        ));
        let once = run(&term);
        assert_eq!(run(&once), once);
    }
}
