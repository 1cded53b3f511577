//! Strict conditionals: the lazy idiom
//! `force (ifThenElse c (delay t) (delay e))` becomes `ifThenElse c t e`
//! when both branches are pure, saving a delay/force pair per branch.

use std::rc::Rc;

use crate::{
    Builtin,
    optimize::{is_pure, map_children, spine},
    term::Term,
};

pub fn run(term: &Rc<Term>) -> Rc<Term> {
    rewrite(term)
}

fn rewrite(term: &Rc<Term>) -> Rc<Term> {
    let rebuilt = map_children(term, &mut |child| rewrite(child));
    if let Term::Force(inner) = rebuilt.as_ref()
        && let (Term::Builtin(Builtin::IfThenElse), 1, args) = spine(inner)
        && let [condition, then_branch, else_branch] = args.as_slice()
        && let (Term::Delay(then_body), Term::Delay(else_body)) =
            (then_branch.as_ref(), else_branch.as_ref())
        && is_pure(then_body)
        && is_pure(else_body)
        && (!is_trivial(then_body) || !is_trivial(else_body))
    {
        return Rc::new(Term::Application {
            function: Rc::new(Term::Application {
                function: Rc::new(Term::Application {
                    function: Rc::new(Term::Force(Rc::new(Term::Builtin(
                        Builtin::IfThenElse,
                    )))),
                    argument: Rc::clone(*condition),
                }),
                argument: Rc::clone(then_body),
            }),
            argument: Rc::clone(else_body),
        });
    }
    rebuilt
}

/// Branches that are bare values gain nothing from being strict.
fn is_trivial(term: &Term) -> bool {
    matches!(term, Term::Variable(_) | Term::Constant(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lazy_if(then_body: Term, else_body: Term) -> Rc<Term> {
        Rc::new(
            Term::builtin(Builtin::IfThenElse)
                .force()
                .apply(Term::boolean(true))
                .apply(then_body.delay())
                .apply(else_body.delay())
                .force(),
        )
    }

    fn strict_if(then_body: Term, else_body: Term) -> Term {
        Term::builtin(Builtin::IfThenElse)
            .force()
            .apply(Term::boolean(true))
            .apply(then_body)
            .apply(else_body)
    }

    #[test]
    fn rewrites_pure_branches() {
        let add = Term::builtin(Builtin::AddInteger)
            .apply(Term::integer(1))
            .apply(Term::integer(2));
        let term = lazy_if(add.clone(), Term::integer(0));
        assert_eq!(*run(&term), strict_if(add, Term::integer(0)));
    }

    #[test]
    fn keeps_failing_branches_lazy() {
        let term = lazy_if(Term::Error, Term::integer(0));
        assert_eq!(run(&term), term);
    }

    #[test]
    fn keeps_trivial_branches_lazy() {
        // Both branches are constants; the rewrite would not pay for
        // itself and is skipped.
        let term = lazy_if(Term::integer(1), Term::integer(2));
        assert_eq!(run(&term), term);
    }

    #[test]
    fn idempotent() {
        let add = Term::builtin(Builtin::AddInteger)
            .apply(Term::integer(1))
            .apply(Term::integer(2));
        let once = run(&lazy_if(add.clone(), add));
        assert_eq!(run(&once), once);
    }
}
