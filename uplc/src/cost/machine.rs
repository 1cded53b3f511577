//! Per-step cost parameters of the machine.

use super::{Budget, ModelError, function::Stream};

/// Cost parameters for the base machine (version `1.0.0`).
///
/// Field order is the canonical order of the flat cost-model array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Base {
    pub application: Budget,
    pub builtin: Budget,
    pub constant: Budget,
    pub delay: Budget,
    pub force: Budget,
    pub lambda: Budget,
    pub startup: Budget,
    pub variable: Budget,
}

impl Base {
    pub(crate) fn push_parameters(&self, out: &mut Vec<i64>) {
        for budget in [
            self.application,
            self.builtin,
            self.constant,
            self.delay,
            self.force,
            self.lambda,
            self.startup,
            self.variable,
        ] {
            push(budget, out);
        }
    }

    pub(crate) fn reparameterize(&self, stream: &mut Stream<'_>) -> Result<Base, ModelError> {
        Ok(Base {
            application: load(stream)?,
            builtin: load(stream)?,
            constant: load(stream)?,
            delay: load(stream)?,
            force: load(stream)?,
            lambda: load(stream)?,
            startup: load(stream)?,
            variable: load(stream)?,
        })
    }
}

impl Default for Base {
    fn default() -> Self {
        let step = Budget {
            execution: 16_000,
            memory: 100,
        };
        Base {
            application: step,
            builtin: step,
            constant: step,
            delay: step,
            force: step,
            lambda: step,
            startup: Budget {
                execution: 100,
                memory: 100,
            },
            variable: step,
        }
    }
}

/// Cost parameters for version `1.1.0`, with `constr` and `case`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Datatypes {
    pub construct: Budget,
    pub case: Budget,
}

impl Datatypes {
    pub(crate) fn push_parameters(&self, out: &mut Vec<i64>) {
        push(self.construct, out);
        push(self.case, out);
    }

    pub(crate) fn reparameterize(&self, stream: &mut Stream<'_>) -> Result<Datatypes, ModelError> {
        Ok(Datatypes {
            construct: load(stream)?,
            case: load(stream)?,
        })
    }
}

impl Default for Datatypes {
    fn default() -> Self {
        let step = Budget {
            execution: 16_000,
            memory: 100,
        };
        Datatypes {
            construct: step,
            case: step,
        }
    }
}

fn load(stream: &mut Stream<'_>) -> Result<Budget, ModelError> {
    Ok(Budget::from_signed(stream.next()?, stream.next()?))
}

fn push(budget: Budget, out: &mut Vec<i64>) {
    out.extend([budget.execution as i64, budget.memory as i64]);
}
