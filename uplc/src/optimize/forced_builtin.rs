//! Forced-builtin extraction.
//!
//! `force (builtin b)` (one quantifier) and `force (force (builtin b))`
//! (two quantifiers) are hoisted into top-level bindings, one per builtin,
//! so every occurrence pays the force steps once. Bindings are lambda
//! abstractions with immediate application, ordered lexicographically by
//! the generated name.

use std::{
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
};

use crate::{Builtin, DeBruijn, term::{Binding, Term}};

const NAME_PREFIX: &str = "__builtin_";

pub fn run(term: &Rc<Term>, exceptions: &BTreeSet<Builtin>) -> Rc<Term> {
    // Builtins already bound by a previous extraction are left alone;
    // their occurrences are variables by now.
    let bound = existing_bindings(term);

    let mut found = BTreeSet::new();
    collect(term, exceptions, &bound, &mut found);
    if found.is_empty() {
        return Rc::clone(term);
    }

    let taken = parameter_names(term);
    let mut bindings: Vec<(Rc<str>, Builtin)> = found
        .into_iter()
        .map(|builtin| (fresh_name(builtin, &taken), builtin))
        .collect();
    bindings.sort_by(|a, b| a.0.cmp(&b.0));

    let positions: BTreeMap<Builtin, u32> = bindings
        .iter()
        .enumerate()
        .map(|(j, (_, builtin))| (*builtin, (bindings.len() - 1 - j) as u32))
        .collect();

    let mut wrapped = replace(term, 0, &positions);
    for (name, builtin) in bindings.into_iter().rev() {
        let mut bound_term = Term::Builtin(builtin);
        for _ in 0..builtin.quantifiers() {
            bound_term = bound_term.force();
        }
        wrapped = Rc::new(
            Term::Lambda {
                parameter: name,
                body: wrapped,
            }
            .apply(bound_term),
        );
    }
    wrapped
}

/// A `force` spine that fully saturates the quantifiers of a bare builtin.
fn forced_builtin(term: &Term) -> Option<Builtin> {
    match term {
        Term::Force(inner) => match inner.as_ref() {
            Term::Builtin(builtin) if builtin.quantifiers() == 1 => Some(*builtin),
            Term::Force(innermost) => match innermost.as_ref() {
                Term::Builtin(builtin) if builtin.quantifiers() == 2 => Some(*builtin),
                _ => None,
            },
            _ => None,
        },
        _ => None,
    }
}

/// Walk the binding prelude produced by a previous run.
fn existing_bindings(term: &Rc<Term>) -> BTreeSet<Builtin> {
    let mut bound = BTreeSet::new();
    let mut current = term;
    while let Term::Application { function, argument } = current.as_ref()
        && let Term::Lambda { parameter, body } = function.as_ref()
        && parameter.starts_with(NAME_PREFIX)
        && let Some(builtin) = forced_builtin(argument)
    {
        bound.insert(builtin);
        current = body;
    }
    bound
}

fn collect(
    term: &Rc<Term>,
    exceptions: &BTreeSet<Builtin>,
    bound: &BTreeSet<Builtin>,
    found: &mut BTreeSet<Builtin>,
) {
    if let Some(builtin) = forced_builtin(term) {
        if !exceptions.contains(&builtin) && !bound.contains(&builtin) {
            found.insert(builtin);
        }
        return;
    }
    match term.as_ref() {
        Term::Lambda { body, .. } | Term::Delay(body) | Term::Force(body) => {
            collect(body, exceptions, bound, found)
        }
        Term::Application { function, argument } => {
            collect(function, exceptions, bound, found);
            collect(argument, exceptions, bound, found);
        }
        Term::Construct { fields, .. } => fields
            .iter()
            .for_each(|f| collect(f, exceptions, bound, found)),
        Term::Case {
            scrutinee,
            branches,
        } => {
            collect(scrutinee, exceptions, bound, found);
            branches
                .iter()
                .for_each(|b| collect(b, exceptions, bound, found));
        }
        Term::Variable(_) | Term::Constant(_) | Term::Builtin(_) | Term::Error => {}
    }
}

fn parameter_names(term: &Rc<Term>) -> BTreeSet<Rc<str>> {
    fn walk(term: &Rc<Term>, out: &mut BTreeSet<Rc<str>>) {
        match term.as_ref() {
            Term::Lambda { parameter, body } => {
                out.insert(Rc::clone(parameter));
                walk(body, out);
            }
            Term::Application { function, argument } => {
                walk(function, out);
                walk(argument, out);
            }
            Term::Delay(body) | Term::Force(body) => walk(body, out),
            Term::Construct { fields, .. } => fields.iter().for_each(|f| walk(f, out)),
            Term::Case {
                scrutinee,
                branches,
            } => {
                walk(scrutinee, out);
                branches.iter().for_each(|b| walk(b, out));
            }
            Term::Variable(_) | Term::Constant(_) | Term::Builtin(_) | Term::Error => {}
        }
    }

    let mut out = BTreeSet::new();
    walk(term, &mut out);
    out
}

/// `__builtin_<name>`, with a counter suffix when user code already binds
/// that name.
fn fresh_name(builtin: Builtin, taken: &BTreeSet<Rc<str>>) -> Rc<str> {
    let wire_name: &'static str = builtin.into();
    let base = format!("{NAME_PREFIX}{wire_name}");
    if !taken.contains(base.as_str()) {
        return Rc::from(base.as_str());
    }
    let mut counter = 0usize;
    loop {
        let candidate = format!("{base}_{counter}");
        if !taken.contains(candidate.as_str()) {
            return Rc::from(candidate.as_str());
        }
        counter += 1;
    }
}

fn replace(term: &Rc<Term>, depth: u32, positions: &BTreeMap<Builtin, u32>) -> Rc<Term> {
    if let Some(builtin) = forced_builtin(term)
        && let Some(position) = positions.get(&builtin)
    {
        let wire_name: &'static str = builtin.into();
        return Rc::new(Term::Variable(Binding {
            name: Rc::from(wire_name),
            index: DeBruijn(depth + position + 1),
        }));
    }
    match term.as_ref() {
        Term::Lambda { parameter, body } => Rc::new(Term::Lambda {
            parameter: Rc::clone(parameter),
            body: replace(body, depth + 1, positions),
        }),
        Term::Application { function, argument } => Rc::new(Term::Application {
            function: replace(function, depth, positions),
            argument: replace(argument, depth, positions),
        }),
        Term::Delay(body) => Rc::new(Term::Delay(replace(body, depth, positions))),
        Term::Force(body) => Rc::new(Term::Force(replace(body, depth, positions))),
        Term::Construct { tag, fields } => Rc::new(Term::Construct {
            tag: *tag,
            fields: fields.iter().map(|f| replace(f, depth, positions)).collect(),
        }),
        Term::Case {
            scrutinee,
            branches,
        } => Rc::new(Term::Case {
            scrutinee: replace(scrutinee, depth, positions),
            branches: branches
                .iter()
                .map(|b| replace(b, depth, positions))
                .collect(),
        }),
        Term::Variable(_) | Term::Constant(_) | Term::Builtin(_) | Term::Error => Rc::clone(term),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forced(builtin: Builtin) -> Term {
        let mut term = Term::builtin(builtin);
        for _ in 0..builtin.quantifiers() {
            term = term.force();
        }
        term
    }

    #[test]
    fn extracts_shared_bindings() {
        // Two uses of forced headList become one binding and two variables.
        let list = Term::var("xs", 1);
        let term = Rc::new(Term::lambda(
            "xs",
            forced(Builtin::HeadList)
                .apply(forced(Builtin::HeadList).apply(list.clone()).apply(list)),
        ));
        let extracted = run(&term, &BTreeSet::new());

        let Term::Application { function, argument } = extracted.as_ref() else {
            panic!("expected a binding application");
        };
        assert_eq!(*argument.as_ref(), forced(Builtin::HeadList));
        let Term::Lambda { parameter, body } = function.as_ref() else {
            panic!("expected a binding lambda");
        };
        assert_eq!(&**parameter, "__builtin_headList");
        // No forced builtin remains in the body.
        let mut found = BTreeSet::new();
        collect(body, &BTreeSet::new(), &BTreeSet::new(), &mut found);
        assert!(found.is_empty());
    }

    #[test]
    fn bindings_are_sorted_by_name() {
        let term = Rc::new(
            forced(Builtin::SndPair).apply(forced(Builtin::FstPair).apply(Term::var("p", 1))),
        );
        let extracted = run(&term, &BTreeSet::new());
        // fstPair sorts before sndPair, so it is the outermost binding.
        let Term::Application { function, argument } = extracted.as_ref() else {
            panic!("expected a binding application");
        };
        assert_eq!(*argument.as_ref(), forced(Builtin::FstPair));
        let Term::Lambda { parameter, .. } = function.as_ref() else {
            panic!("expected a binding lambda");
        };
        assert_eq!(&**parameter, "__builtin_fstPair");
    }

    #[test]
    fn respects_the_exception_set() {
        let term = Rc::new(forced(Builtin::HeadList).apply(Term::var("xs", 1)));
        let exceptions = BTreeSet::from([Builtin::HeadList]);
        assert_eq!(run(&term, &exceptions), term);
    }

    #[test]
    fn idempotent() {
        let term = Rc::new(Term::lambda(
            "xs",
            forced(Builtin::HeadList).apply(Term::var("xs", 1)),
        ));
        let once = run(&term, &BTreeSet::new());
        assert_eq!(run(&once, &BTreeSet::new()), once);
    }
}
