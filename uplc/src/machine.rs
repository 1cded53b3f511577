//! Evaluation of programs according to the CEK machine defined in the
//! [specification][spec] section 2.4.
//!
//! The continuation stack is an explicit [`Vec`] of frames; the machine
//! never recurses on the host stack, so deeply nested programs are bounded
//! by the budget rather than by stack space.
//!
//! [spec]: https://plutus.cardano.intersectmbo.org/resources/plutus-core-spec.pdf

use std::rc::Rc;

use crate::{
    Builtin, Constant, DeBruijn, Program,
    cost::{self, Budget, Category, Parameters, Tally},
    term::{Binding, Term},
};

pub mod environment;
pub use environment::Environment;

/// Represents a processed value in the CEK machine.
#[derive(Debug, Clone)]
pub enum Value {
    Constant(Rc<Constant>),
    Delay {
        body: Rc<Term>,
        environment: Environment,
    },
    Lambda {
        parameter: Rc<str>,
        body: Rc<Term>,
        environment: Environment,
    },
    Construct {
        tag: u64,
        values: Vec<Value>,
    },
    Builtin {
        builtin: Builtin,
        /// Forces still required before arguments are accepted.
        polymorphism: u8,
        args: Vec<Value>,
    },
}

impl Value {
    /// The memory footprint reported to builtin cost functions.
    pub fn ex_memory(&self) -> i64 {
        match self {
            Value::Constant(constant) => constant.ex_memory(),
            Value::Construct { values, .. } => values
                .iter()
                .map(Value::ex_memory)
                .fold(1i64, i64::saturating_add),
            Value::Delay { .. } | Value::Lambda { .. } | Value::Builtin { .. } => 1,
        }
    }

    /// Discharge the value back into a term.
    ///
    /// A final value may still reference its captured environment; those
    /// references are replaced by the discharged bound values, producing a
    /// closed term.
    pub fn discharge(self) -> Term {
        match self {
            Value::Constant(constant) => Term::Constant(constant),
            Value::Delay { body, environment } => {
                Term::Delay(discharge_term(&body, &environment, 0))
            }
            Value::Lambda {
                parameter,
                body,
                environment,
            } => Term::Lambda {
                parameter,
                body: discharge_term(&body, &environment, 1),
            },
            Value::Construct { tag, values } => Term::Construct {
                tag,
                fields: values
                    .into_iter()
                    .map(|v| Rc::new(v.discharge()))
                    .collect(),
            },
            Value::Builtin {
                builtin,
                polymorphism,
                args,
            } => {
                let mut term = Term::Builtin(builtin);
                for _ in 0..builtin.quantifiers() - polymorphism {
                    term = term.force();
                }
                for arg in args {
                    term = term.apply(arg.discharge());
                }
                term
            }
        }
    }
}

fn discharge_term(term: &Rc<Term>, environment: &Environment, depth: u32) -> Rc<Term> {
    match term.as_ref() {
        Term::Variable(binding) => {
            if binding.index.0 <= depth {
                Rc::clone(term)
            } else {
                match environment.get(DeBruijn(binding.index.0 - depth)) {
                    // Discharged environment entries are closed, so they can
                    // be inlined without shifting.
                    Some(value) => Rc::new(value.clone().discharge()),
                    None => Rc::clone(term),
                }
            }
        }
        Term::Lambda { parameter, body } => Rc::new(Term::Lambda {
            parameter: Rc::clone(parameter),
            body: discharge_term(body, environment, depth + 1),
        }),
        Term::Application { function, argument } => Rc::new(Term::Application {
            function: discharge_term(function, environment, depth),
            argument: discharge_term(argument, environment, depth),
        }),
        Term::Delay(body) => Rc::new(Term::Delay(discharge_term(body, environment, depth))),
        Term::Force(body) => Rc::new(Term::Force(discharge_term(body, environment, depth))),
        Term::Constant(_) | Term::Builtin(_) | Term::Error => Rc::clone(term),
        Term::Construct { tag, fields } => Rc::new(Term::Construct {
            tag: *tag,
            fields: fields
                .iter()
                .map(|f| discharge_term(f, environment, depth))
                .collect(),
        }),
        Term::Case {
            scrutinee,
            branches,
        } => Rc::new(Term::Case {
            scrutinee: discharge_term(scrutinee, environment, depth),
            branches: branches
                .iter()
                .map(|b| discharge_term(b, environment, depth))
                .collect(),
        }),
    }
}

/// Why an evaluation stopped without a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The program executed `error`.
    #[error("the program evaluated to an error")]
    UserError,
    /// The spender refused a charge; carries the category at which it
    /// happened and the totals at that point.
    #[error("budget exceeded while charging {category:?}")]
    BudgetExceeded { category: Category, budget: Budget },
    /// A value of the wrong kind reached an operation.
    #[error("type mismatch during evaluation")]
    TypeMismatch,
    /// Argument shapes were right but a value was invalid.
    #[error("invalid argument value")]
    DomainError,
    /// A data eliminator hit the wrong variant, or a value with no
    /// serialized form was serialized.
    #[error("malformed or non-decodable payload")]
    DecodeError,
    /// `case` dispatched on a tag with no branch.
    #[error("no case branch for constructor tag {tag}")]
    MissingBranch { tag: u64 },
}

/// The trace sink of one evaluation.
///
/// Logging is not budgeted and the logger never inspects values, so it
/// cannot influence the result.
#[derive(Debug, Default)]
pub struct Logger {
    entries: Vec<String>,
}

impl Logger {
    pub fn log(&mut self, message: impl Into<String>) {
        self.entries.push(message.into());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn drain(self) -> Vec<String> {
        self.entries
    }
}

/// Everything `evaluate_debug` reports: the result, the spent budget, the
/// per-category breakdown, and the captured trace log.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub result: Result<Program, Error>,
    pub budget: Budget,
    pub costs: Tally,
    pub logs: Vec<String>,
}

/// Represents a frame of the CEK machine's stack.
enum Frame {
    Force,
    /// The argument term, waiting for its function value.
    ApplyLeftTerm {
        argument: Rc<Term>,
        environment: Environment,
    },
    /// The function value, waiting for its argument value.
    ApplyRightValue(Value),
    /// An argument value, waiting for a function value; used when a case
    /// branch is applied to the constructor fields.
    ApplyLeftValue(Value),
    Construct {
        tag: u64,
        fields: Vec<Rc<Term>>,
        next: usize,
        environment: Environment,
        values: Vec<Value>,
    },
    Case {
        branches: Vec<Rc<Term>>,
        environment: Environment,
    },
}

/// Run a term according to the CEK machine.
pub(crate) fn run(
    program_term: &Rc<Term>,
    params: &Parameters,
    context: &mut cost::Context,
    logger: &mut Logger,
) -> Result<Value, Error> {
    let base = &params.base;
    context.spend(Category::Startup, base.startup)?;

    let mut stack: Vec<Frame> = Vec::new();
    let mut environment = Environment::default();
    let mut term = Rc::clone(program_term);

    loop {
        let mut ret = match term.as_ref() {
            Term::Variable(Binding { index, .. }) => {
                context.spend(Category::Variable, base.variable)?;
                // Decoding rejects open terms, so a miss here means the
                // caller built an open term by hand.
                environment.get(*index).ok_or(Error::DecodeError)?.clone()
            }
            Term::Lambda { parameter, body } => {
                context.spend(Category::Lambda, base.lambda)?;
                Value::Lambda {
                    parameter: Rc::clone(parameter),
                    body: Rc::clone(body),
                    environment: environment.clone(),
                }
            }
            Term::Application { function, argument } => {
                context.spend(Category::Application, base.application)?;
                stack.push(Frame::ApplyLeftTerm {
                    argument: Rc::clone(argument),
                    environment: environment.clone(),
                });
                term = Rc::clone(function);
                continue;
            }
            Term::Delay(body) => {
                context.spend(Category::Delay, base.delay)?;
                Value::Delay {
                    body: Rc::clone(body),
                    environment: environment.clone(),
                }
            }
            Term::Force(body) => {
                context.spend(Category::Force, base.force)?;
                stack.push(Frame::Force);
                term = Rc::clone(body);
                continue;
            }
            Term::Constant(constant) => {
                context.spend(Category::Constant, base.constant)?;
                Value::Constant(Rc::clone(constant))
            }
            Term::Builtin(builtin) => {
                context.spend(Category::Builtin, base.builtin)?;
                Value::Builtin {
                    builtin: *builtin,
                    polymorphism: builtin.quantifiers(),
                    args: Vec::new(),
                }
            }
            Term::Error => return Err(Error::UserError),
            Term::Construct { tag, fields } => {
                let datatypes = params.datatypes.as_ref().ok_or(Error::DecodeError)?;
                context.spend(Category::Construct, datatypes.construct)?;
                match fields.first() {
                    Some(first) => {
                        stack.push(Frame::Construct {
                            tag: *tag,
                            fields: fields.clone(),
                            next: 1,
                            environment: environment.clone(),
                            values: Vec::new(),
                        });
                        term = Rc::clone(first);
                        continue;
                    }
                    None => Value::Construct {
                        tag: *tag,
                        values: Vec::new(),
                    },
                }
            }
            Term::Case {
                scrutinee,
                branches,
            } => {
                let datatypes = params.datatypes.as_ref().ok_or(Error::DecodeError)?;
                context.spend(Category::Case, datatypes.case)?;
                stack.push(Frame::Case {
                    branches: branches.clone(),
                    environment: environment.clone(),
                });
                term = Rc::clone(scrutinee);
                continue;
            }
        };

        // Return phase: feed `ret` into the stack until a new term must be
        // computed or the stack is empty.
        environment = loop {
            break match (stack.pop(), ret) {
                (None, value) => return Ok(value),
                (Some(Frame::Force), Value::Delay { body, environment }) => {
                    term = body;
                    environment
                }
                (
                    Some(Frame::Force),
                    Value::Builtin {
                        builtin,
                        polymorphism,
                        args,
                    },
                ) if polymorphism > 0 => {
                    ret = Value::Builtin {
                        builtin,
                        polymorphism: polymorphism - 1,
                        args,
                    };
                    continue;
                }
                (Some(Frame::Force), _) => return Err(Error::TypeMismatch),
                (Some(Frame::ApplyLeftTerm { argument, environment }), function) => {
                    stack.push(Frame::ApplyRightValue(function));
                    term = argument;
                    environment
                }
                (
                    Some(Frame::ApplyRightValue(Value::Lambda {
                        body, environment, ..
                    })),
                    argument,
                )
                | (
                    Some(Frame::ApplyLeftValue(argument)),
                    Value::Lambda {
                        body, environment, ..
                    },
                ) => {
                    term = body;
                    environment.extend(argument)
                }
                (
                    Some(Frame::ApplyRightValue(Value::Builtin {
                        builtin,
                        polymorphism: 0,
                        mut args,
                    })),
                    argument,
                )
                | (
                    Some(Frame::ApplyLeftValue(argument)),
                    Value::Builtin {
                        builtin,
                        polymorphism: 0,
                        mut args,
                    },
                ) => {
                    args.push(argument);
                    ret = if args.len() == builtin.arity() as usize {
                        builtin.apply(args, params, context, logger)?
                    } else {
                        Value::Builtin {
                            builtin,
                            polymorphism: 0,
                            args,
                        }
                    };
                    continue;
                }
                (Some(Frame::ApplyRightValue(_) | Frame::ApplyLeftValue(_)), _) => {
                    return Err(Error::TypeMismatch);
                }
                (
                    Some(Frame::Construct {
                        tag,
                        fields,
                        next,
                        environment,
                        mut values,
                    }),
                    value,
                ) => {
                    values.push(value);
                    match fields.get(next) {
                        Some(field) => {
                            term = Rc::clone(field);
                            stack.push(Frame::Construct {
                                tag,
                                fields: fields.clone(),
                                next: next + 1,
                                environment: environment.clone(),
                                values,
                            });
                            environment
                        }
                        None => {
                            ret = Value::Construct { tag, values };
                            continue;
                        }
                    }
                }
                (
                    Some(Frame::Case {
                        branches,
                        environment,
                    }),
                    Value::Construct { tag, values },
                ) => {
                    let branch = branches
                        .get(usize::try_from(tag).unwrap_or(usize::MAX))
                        .ok_or(Error::MissingBranch { tag })?;
                    term = Rc::clone(branch);
                    // The branch is applied to the fields left to right, so
                    // the first field must be popped first.
                    stack.extend(values.into_iter().map(Frame::ApplyLeftValue).rev());
                    environment
                }
                (Some(Frame::Case { .. }), _) => return Err(Error::TypeMismatch),
            };
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discharge_closes_over_the_environment() {
        // \x -> (\y -> x) applied to 7: the final lambda still references x
        // through its captured environment.
        let environment = Environment::default().extend(Value::Constant(Rc::new(
            Constant::Integer(7.into()),
        )));
        let value = Value::Lambda {
            parameter: "y".into(),
            body: Rc::new(Term::var("x", 2)),
            environment,
        };
        assert_eq!(value.discharge(), Term::lambda("y", Term::integer(7)));
    }

    #[test]
    fn discharge_rebuilds_forced_builtins() {
        let value = Value::Builtin {
            builtin: Builtin::IfThenElse,
            polymorphism: 0,
            args: vec![Value::Constant(Rc::new(Constant::Boolean(true)))],
        };
        assert_eq!(
            value.discharge(),
            Term::builtin(Builtin::IfThenElse)
                .force()
                .apply(Term::boolean(true))
        );
    }
}
