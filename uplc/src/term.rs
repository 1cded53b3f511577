//! The term language evaluated by the machine.
//!
//! Terms form an immutable tree with [`Rc`]-shared subterms: the optimizer
//! produces new trees and reuses unchanged branches. Variables are resolved
//! De Bruijn indices; the textual name next to an index is kept for
//! debugging only and is ignored by equality.

use std::{collections::BTreeSet, rc::Rc};

use crate::{Builtin, Constant, DeBruijn};

/// A variable occurrence: a debug name plus the authoritative index.
#[derive(Debug, Clone)]
pub struct Binding {
    pub name: Rc<str>,
    pub index: DeBruijn,
}

impl PartialEq for Binding {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for Binding {}

/// A term of the language.
#[derive(Debug, Clone)]
pub enum Term {
    Variable(Binding),
    Lambda {
        parameter: Rc<str>,
        body: Rc<Term>,
    },
    Application {
        function: Rc<Term>,
        argument: Rc<Term>,
    },
    Delay(Rc<Term>),
    Force(Rc<Term>),
    Constant(Rc<Constant>),
    Builtin(Builtin),
    Error,
    /// Introduced in version `1.1.0`.
    Construct {
        tag: u64,
        fields: Vec<Rc<Term>>,
    },
    /// Introduced in version `1.1.0`.
    Case {
        scrutinee: Rc<Term>,
        branches: Vec<Rc<Term>>,
    },
}

/// Equality is structural on the De Bruijn form: binder and variable names
/// do not participate, so alpha-equivalent closed terms compare equal.
impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Term::Variable(a), Term::Variable(b)) => a == b,
            (Term::Lambda { body: a, .. }, Term::Lambda { body: b, .. }) => a == b,
            (
                Term::Application {
                    function: f0,
                    argument: a0,
                },
                Term::Application {
                    function: f1,
                    argument: a1,
                },
            ) => f0 == f1 && a0 == a1,
            (Term::Delay(a), Term::Delay(b)) => a == b,
            (Term::Force(a), Term::Force(b)) => a == b,
            (Term::Constant(a), Term::Constant(b)) => a == b,
            (Term::Builtin(a), Term::Builtin(b)) => a == b,
            (Term::Error, Term::Error) => true,
            (
                Term::Construct {
                    tag: t0,
                    fields: f0,
                },
                Term::Construct {
                    tag: t1,
                    fields: f1,
                },
            ) => t0 == t1 && f0 == f1,
            (
                Term::Case {
                    scrutinee: s0,
                    branches: b0,
                },
                Term::Case {
                    scrutinee: s1,
                    branches: b1,
                },
            ) => s0 == s1 && b0 == b1,
            _ => false,
        }
    }
}

impl Term {
    pub fn var(name: impl Into<Rc<str>>, index: u32) -> Term {
        Term::Variable(Binding {
            name: name.into(),
            index: DeBruijn(index),
        })
    }

    pub fn lambda(parameter: impl Into<Rc<str>>, body: Term) -> Term {
        Term::Lambda {
            parameter: parameter.into(),
            body: Rc::new(body),
        }
    }

    pub fn apply(self, argument: Term) -> Term {
        Term::Application {
            function: Rc::new(self),
            argument: Rc::new(argument),
        }
    }

    pub fn delay(self) -> Term {
        Term::Delay(Rc::new(self))
    }

    pub fn force(self) -> Term {
        Term::Force(Rc::new(self))
    }

    pub fn constant(constant: Constant) -> Term {
        Term::Constant(Rc::new(constant))
    }

    pub fn builtin(builtin: Builtin) -> Term {
        Term::Builtin(builtin)
    }

    pub fn integer(value: impl Into<rug::Integer>) -> Term {
        Term::constant(Constant::Integer(value.into()))
    }

    pub fn boolean(value: bool) -> Term {
        Term::constant(Constant::Boolean(value))
    }

    pub fn unit() -> Term {
        Term::constant(Constant::Unit)
    }

    /// The set of free De Bruijn indices, as seen from outside the term.
    pub fn free_variables(&self) -> BTreeSet<u32> {
        fn collect(term: &Term, depth: u32, out: &mut BTreeSet<u32>) {
            match term {
                Term::Variable(binding) => {
                    if binding.index.0 > depth {
                        out.insert(binding.index.0 - depth);
                    }
                }
                Term::Lambda { body, .. } => collect(body, depth + 1, out),
                Term::Application { function, argument } => {
                    collect(function, depth, out);
                    collect(argument, depth, out);
                }
                Term::Delay(body) | Term::Force(body) => collect(body, depth, out),
                Term::Constant(_) | Term::Builtin(_) | Term::Error => {}
                Term::Construct { fields, .. } => {
                    fields.iter().for_each(|f| collect(f, depth, out));
                }
                Term::Case {
                    scrutinee,
                    branches,
                } => {
                    collect(scrutinee, depth, out);
                    branches.iter().for_each(|b| collect(b, depth, out));
                }
            }
        }

        let mut out = BTreeSet::new();
        collect(self, 0, &mut out);
        out
    }

    /// Number of occurrences of the free variable `index` (as seen from
    /// outside the term).
    pub fn occurrences(&self, index: u32) -> usize {
        match self {
            Term::Variable(binding) => (binding.index.0 == index) as usize,
            Term::Lambda { body, .. } => body.occurrences(index + 1),
            Term::Application { function, argument } => {
                function.occurrences(index) + argument.occurrences(index)
            }
            Term::Delay(body) | Term::Force(body) => body.occurrences(index),
            Term::Constant(_) | Term::Builtin(_) | Term::Error => 0,
            Term::Construct { fields, .. } => {
                fields.iter().map(|f| f.occurrences(index)).sum()
            }
            Term::Case {
                scrutinee,
                branches,
            } => {
                scrutinee.occurrences(index)
                    + branches.iter().map(|b| b.occurrences(index)).sum::<usize>()
            }
        }
    }

    /// Whether the free variable `index` occurs at all.
    pub fn mentions(&self, index: u32) -> bool {
        self.occurrences(index) != 0
    }
}

/// Add `delta` to every variable pointing above `cutoff` binders.
///
/// Unchanged subtrees are shared with the input.
pub(crate) fn shift(term: &Rc<Term>, delta: u32, cutoff: u32) -> Rc<Term> {
    if delta == 0 {
        return Rc::clone(term);
    }
    map_variables(term, cutoff, &|binding, cutoff| {
        if binding.index.0 > cutoff {
            Binding {
                name: Rc::clone(&binding.name),
                index: DeBruijn(binding.index.0 + delta),
            }
        } else {
            binding.clone()
        }
    })
}

/// Subtract one from every variable pointing above `cutoff` binders.
///
/// The caller must have checked that index `cutoff + 1` does not occur.
pub(crate) fn unshift(term: &Rc<Term>, cutoff: u32) -> Rc<Term> {
    map_variables(term, cutoff, &|binding, cutoff| {
        if binding.index.0 > cutoff {
            Binding {
                name: Rc::clone(&binding.name),
                index: DeBruijn(binding.index.0 - 1),
            }
        } else {
            binding.clone()
        }
    })
}

/// Replace the outermost bound variable of `body` (index 1) with
/// `argument`, lowering the remaining free variables by one.
///
/// This is the substitution of beta-reduction; shifting of `argument` under
/// binders keeps it capture-free.
pub(crate) fn substitute(body: &Rc<Term>, argument: &Rc<Term>) -> Rc<Term> {
    fn worker(term: &Rc<Term>, depth: u32, argument: &Rc<Term>) -> Rc<Term> {
        match term.as_ref() {
            Term::Variable(binding) => {
                let target = depth + 1;
                if binding.index.0 == target {
                    shift(argument, depth, 0)
                } else if binding.index.0 > target {
                    Rc::new(Term::Variable(Binding {
                        name: Rc::clone(&binding.name),
                        index: DeBruijn(binding.index.0 - 1),
                    }))
                } else {
                    Rc::clone(term)
                }
            }
            Term::Lambda { parameter, body } => Rc::new(Term::Lambda {
                parameter: Rc::clone(parameter),
                body: worker(body, depth + 1, argument),
            }),
            Term::Application { function, argument: a } => Rc::new(Term::Application {
                function: worker(function, depth, argument),
                argument: worker(a, depth, argument),
            }),
            Term::Delay(body) => Rc::new(Term::Delay(worker(body, depth, argument))),
            Term::Force(body) => Rc::new(Term::Force(worker(body, depth, argument))),
            Term::Constant(_) | Term::Builtin(_) | Term::Error => Rc::clone(term),
            Term::Construct { tag, fields } => Rc::new(Term::Construct {
                tag: *tag,
                fields: fields.iter().map(|f| worker(f, depth, argument)).collect(),
            }),
            Term::Case {
                scrutinee,
                branches,
            } => Rc::new(Term::Case {
                scrutinee: worker(scrutinee, depth, argument),
                branches: branches.iter().map(|b| worker(b, depth, argument)).collect(),
            }),
        }
    }

    worker(body, 0, argument)
}

fn map_variables(
    term: &Rc<Term>,
    cutoff: u32,
    f: &impl Fn(&Binding, u32) -> Binding,
) -> Rc<Term> {
    match term.as_ref() {
        Term::Variable(binding) => Rc::new(Term::Variable(f(binding, cutoff))),
        Term::Lambda { parameter, body } => Rc::new(Term::Lambda {
            parameter: Rc::clone(parameter),
            body: map_variables(body, cutoff + 1, f),
        }),
        Term::Application { function, argument } => Rc::new(Term::Application {
            function: map_variables(function, cutoff, f),
            argument: map_variables(argument, cutoff, f),
        }),
        Term::Delay(body) => Rc::new(Term::Delay(map_variables(body, cutoff, f))),
        Term::Force(body) => Rc::new(Term::Force(map_variables(body, cutoff, f))),
        Term::Constant(_) | Term::Builtin(_) | Term::Error => Rc::clone(term),
        Term::Construct { tag, fields } => Rc::new(Term::Construct {
            tag: *tag,
            fields: fields.iter().map(|x| map_variables(x, cutoff, f)).collect(),
        }),
        Term::Case {
            scrutinee,
            branches,
        } => Rc::new(Term::Case {
            scrutinee: map_variables(scrutinee, cutoff, f),
            branches: branches.iter().map(|x| map_variables(x, cutoff, f)).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_equality() {
        let a = Term::lambda("x", Term::var("x", 1));
        let b = Term::lambda("y", Term::var("y", 1));
        assert_eq!(a, b);
        assert_ne!(a, Term::lambda("x", Term::var("x", 2)));
    }

    #[test]
    fn free_variables() {
        // \x -> y (x z)
        let term = Term::lambda(
            "x",
            Term::var("y", 2).apply(Term::var("x", 1).apply(Term::var("z", 3))),
        );
        assert_eq!(
            term.free_variables().into_iter().collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn beta_substitution() {
        // (\x -> \y -> x) a  reduces to  \y -> a
        let body = Rc::new(Term::lambda("y", Term::var("x", 2)));
        let arg = Rc::new(Term::var("a", 1));
        let reduced = substitute(&body, &arg);
        assert_eq!(*reduced, Term::lambda("y", Term::var("a", 2)));
    }

    #[test]
    fn substitution_lowers_outer_variables() {
        // body = x3 applied under one binder; substituting for x1 lowers it.
        let body = Rc::new(Term::var("z", 3));
        let arg = Rc::new(Term::integer(1));
        assert_eq!(*substitute(&body, &arg), Term::var("z", 2));
    }
}
