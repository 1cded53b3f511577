//! Cost accounting.
//!
//! This module defines the budget, the per-category tally, the spending
//! [`Context`] consulted on every machine step, and the [`Parameters`]
//! record that bundles step costs, builtin cost functions, and limits for
//! one Plutus version.

use std::collections::BTreeMap;

use crate::{Builtin, builtin::Semantics, machine::Error};

pub mod function;
pub mod machine;

/// Execution units: a pair of independent counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Budget {
    pub memory: u64,
    pub execution: u64,
}

impl Budget {
    pub const ZERO: Budget = Budget {
        memory: 0,
        execution: 0,
    };

    /// The per-transaction limits of current mainnet protocol parameters.
    pub const TRANSACTION: Budget = Budget {
        memory: 14_000_000,
        execution: 10_000_000_000,
    };

    pub fn saturating_add(self, other: Budget) -> Budget {
        Budget {
            memory: self.memory.saturating_add(other.memory),
            execution: self.execution.saturating_add(other.execution),
        }
    }

    /// Clamp signed cost-function outputs; negative costs never charge.
    pub(crate) fn from_signed(execution: i64, memory: i64) -> Budget {
        Budget {
            memory: memory.max(0) as u64,
            execution: execution.max(0) as u64,
        }
    }

    /// Whether either counter exceeds the corresponding counter of `limit`.
    fn exceeds(self, limit: Budget) -> bool {
        self.memory > limit.memory || self.execution > limit.execution
    }
}

/// What a unit of budget was spent on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Startup,
    Variable,
    Lambda,
    Application,
    Delay,
    Force,
    Constant,
    Builtin,
    Construct,
    Case,
    /// A saturated builtin application, charged before it reduces.
    BuiltinApplication(Builtin),
}

/// Accumulated cost per category, in a deterministic order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally(BTreeMap<Category, Budget>);

impl Tally {
    pub fn get(&self, category: Category) -> Budget {
        self.0.get(&category).copied().unwrap_or(Budget::ZERO)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, Budget)> + '_ {
        self.0.iter().map(|(c, b)| (*c, *b))
    }

    fn add(&mut self, category: Category, cost: Budget) {
        let entry = self.0.entry(category).or_default();
        *entry = entry.saturating_add(cost);
    }
}

/// Cost accounting context of a single evaluation.
///
/// The context records every charge and signals
/// [`BudgetExceeded`](crate::machine::Error::BudgetExceeded) as soon as a
/// limit counter is passed; with no limit the evaluation is unmetered.
#[derive(Debug, Clone, Default)]
pub struct Context {
    spent: Budget,
    limit: Option<Budget>,
    tally: Tally,
}

impl Context {
    pub fn new(limit: Option<Budget>) -> Self {
        Context {
            limit,
            ..Default::default()
        }
    }

    pub(crate) fn spend(&mut self, category: Category, cost: Budget) -> Result<(), Error> {
        self.spent = self.spent.saturating_add(cost);
        self.tally.add(category, cost);
        match self.limit {
            Some(limit) if self.spent.exceeds(limit) => Err(Error::BudgetExceeded {
                category,
                budget: self.spent,
            }),
            _ => Ok(()),
        }
    }

    pub fn spent(&self) -> Budget {
        self.spent
    }

    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    pub(crate) fn into_tally(self) -> Tally {
        self.tally
    }
}

/// A Plutus ledger language version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Plutus {
    V1,
    V2,
    V3,
}

impl Plutus {
    /// The byte prefixed to the script bytes when hashing.
    pub fn language_tag(self) -> u8 {
        match self {
            Plutus::V1 => 1,
            Plutus::V2 => 2,
            Plutus::V3 => 3,
        }
    }
}

/// Everything the machine consumes from protocol parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameters {
    pub plutus: Plutus,
    pub semantics: Semantics,
    pub base: machine::Base,
    pub datatypes: Option<machine::Datatypes>,
    /// Absent means unmetered evaluation.
    pub limit: Option<Budget>,
    builtins: BTreeMap<Builtin, function::Pair>,
}

impl Parameters {
    /// Interpret the flat cost-model array for `plutus`: machine step costs
    /// first, `constr`/`case` for V3, then one block per builtin in the
    /// canonical order. The array must be consumed exactly.
    pub fn from_costs(
        plutus: Plutus,
        model: &[i64],
        limit: Option<Budget>,
    ) -> Result<Self, ModelError> {
        let mut stream = function::Stream::new(model);
        let base = machine::Base::default().reparameterize(&mut stream)?;
        let datatypes = match plutus {
            Plutus::V3 => Some(machine::Datatypes::default().reparameterize(&mut stream)?),
            _ => None,
        };
        let mut builtins = BTreeMap::new();
        for builtin in Builtin::cost_model_order(plutus) {
            builtins.insert(*builtin, builtin.default_cost().reparameterize(&mut stream)?);
        }
        if stream.remaining() != 0 {
            return Err(ModelError::TrailingParameters(stream.remaining()));
        }
        Ok(Parameters {
            plutus,
            semantics: Semantics::default_for(plutus),
            base,
            datatypes,
            limit,
            builtins,
        })
    }

    /// The bundled cost model for `plutus`, with the transaction limits.
    pub fn default_for(plutus: Plutus) -> Self {
        let datatypes = match plutus {
            Plutus::V3 => Some(machine::Datatypes::default()),
            _ => None,
        };
        Parameters {
            plutus,
            semantics: Semantics::default_for(plutus),
            base: machine::Base::default(),
            datatypes,
            limit: Some(Budget::TRANSACTION),
            builtins: Builtin::cost_model_order(plutus)
                .iter()
                .map(|b| (*b, b.default_cost()))
                .collect(),
        }
    }

    /// Render back into the flat array accepted by [`Parameters::from_costs`].
    pub fn to_costs(&self) -> Vec<i64> {
        let mut out = Vec::new();
        self.base.push_parameters(&mut out);
        if let Some(datatypes) = &self.datatypes {
            datatypes.push_parameters(&mut out);
        }
        for builtin in Builtin::cost_model_order(self.plutus) {
            self.builtins[builtin].push_parameters(&mut out);
        }
        out
    }

    /// Replace the budget limit, e.g. `None` for unmetered test runs.
    pub fn with_limit(mut self, limit: Option<Budget>) -> Self {
        self.limit = limit;
        self
    }

    /// The cost functions for `builtin`, if it exists at this version.
    pub(crate) fn builtin_cost(&self, builtin: Builtin) -> Option<&function::Pair> {
        self.builtins.get(&builtin)
    }
}

/// A cost-model array did not match the canonical layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("cost model array ended before all parameters were read")]
    MissingParameters,
    #[error("cost model array has {0} unconsumed parameters")]
    TrailingParameters(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spender_accumulates_and_aborts() {
        let mut context = Context::new(Some(Budget {
            memory: 1_000,
            execution: 300,
        }));
        let cost = Budget {
            memory: 10,
            execution: 100,
        };
        context.spend(Category::Startup, cost).unwrap();
        context.spend(Category::Constant, cost).unwrap();
        context.spend(Category::Constant, cost).unwrap();
        assert_eq!(context.spent().execution, 300);
        assert_eq!(context.tally().get(Category::Constant).execution, 200);

        let err = context.spend(Category::Force, cost).unwrap_err();
        match err {
            Error::BudgetExceeded { category, budget } => {
                assert_eq!(category, Category::Force);
                assert_eq!(budget.execution, 400);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unmetered_context_never_aborts() {
        let mut context = Context::new(None);
        let huge = Budget {
            memory: u64::MAX,
            execution: u64::MAX,
        };
        context.spend(Category::Startup, huge).unwrap();
        context.spend(Category::Startup, huge).unwrap();
        assert_eq!(context.spent(), huge);
    }

    #[test]
    fn default_parameters_roundtrip_through_the_wire_format() {
        for plutus in [Plutus::V1, Plutus::V2, Plutus::V3] {
            let defaults = Parameters::default_for(plutus);
            let model = defaults.to_costs();
            let loaded =
                Parameters::from_costs(plutus, &model, Some(Budget::TRANSACTION)).unwrap();
            assert_eq!(defaults, loaded);
            assert!(Parameters::from_costs(plutus, &model[..model.len() - 1], None).is_err());

            let mut extended = model.clone();
            extended.push(0);
            assert!(matches!(
                Parameters::from_costs(plutus, &extended, None),
                Err(ModelError::TrailingParameters(1))
            ));
        }
    }
}
