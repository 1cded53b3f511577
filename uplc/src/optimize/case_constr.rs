//! Application compaction for version `1.1.0` programs: an n-ary
//! application chain `f a₁ … aₙ` with `n > 2` becomes
//! `case (constr 0 [a₁, …, aₙ]) [f]`, replacing n application steps with
//! one `constr` and one `case`.
//!
//! The constr form evaluates the arguments before the function, so the
//! rewrite is restricted to pure functions and arguments.

use std::rc::Rc;

use crate::{
    optimize::is_pure,
    term::Term,
};

pub fn run(term: &Rc<Term>) -> Rc<Term> {
    rewrite(term, false)
}

fn rewrite(term: &Rc<Term>, parent_is_application: bool) -> Rc<Term> {
    let rebuilt = match term.as_ref() {
        Term::Application { function, argument } => Rc::new(Term::Application {
            function: rewrite(function, true),
            argument: rewrite(argument, false),
        }),
        Term::Lambda { parameter, body } => Rc::new(Term::Lambda {
            parameter: Rc::clone(parameter),
            body: rewrite(body, false),
        }),
        Term::Delay(body) => Rc::new(Term::Delay(rewrite(body, false))),
        Term::Force(body) => Rc::new(Term::Force(rewrite(body, false))),
        Term::Construct { tag, fields } => Rc::new(Term::Construct {
            tag: *tag,
            fields: fields.iter().map(|f| rewrite(f, false)).collect(),
        }),
        Term::Case {
            scrutinee,
            branches,
        } => Rc::new(Term::Case {
            scrutinee: rewrite(scrutinee, false),
            branches: branches.iter().map(|b| rewrite(b, false)).collect(),
        }),
        _ => Rc::clone(term),
    };

    // Only the outermost application of a chain is a candidate.
    if !parent_is_application {
        compact(&rebuilt).unwrap_or(rebuilt)
    } else {
        rebuilt
    }
}

fn compact(term: &Rc<Term>) -> Option<Rc<Term>> {
    let mut arguments = Vec::new();
    let mut head = term;
    while let Term::Application { function, argument } = head.as_ref() {
        arguments.push(Rc::clone(argument));
        head = function;
    }
    if arguments.len() <= 2 {
        return None;
    }
    arguments.reverse();
    if !is_pure(head) || !arguments.iter().all(|a| is_pure(a)) {
        return None;
    }
    Some(Rc::new(Term::Case {
        scrutinee: Rc::new(Term::Construct {
            tag: 0,
            fields: arguments,
        }),
        branches: vec![Rc::clone(head)],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(n: usize) -> Rc<Term> {
        let mut term = Term::lambda("f", Term::var("f", 1));
        for i in 0..n {
            term = term.apply(Term::integer(i as i64));
        }
        Rc::new(term)
    }

    #[test]
    fn compacts_long_chains() {
        let compacted = run(&chain(3));
        let Term::Case {
            scrutinee,
            branches,
        } = compacted.as_ref()
        else {
            panic!("expected a case, got {compacted:?}");
        };
        assert_eq!(branches.len(), 1);
        let Term::Construct { tag: 0, fields } = scrutinee.as_ref() else {
            panic!("expected a constr scrutinee");
        };
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn leaves_short_chains() {
        let term = chain(2);
        assert_eq!(run(&term), term);
    }

    #[test]
    fn leaves_impure_chains() {
        let term = Rc::new(
            Term::lambda("f", Term::var("f", 1))
                .apply(Term::integer(0))
                .apply(Term::Error)
                .apply(Term::integer(2)),
        );
        assert_eq!(run(&term), term);
    }

    #[test]
    fn idempotent() {
        let once = run(&chain(5));
        assert_eq!(run(&once), once);
    }
}
