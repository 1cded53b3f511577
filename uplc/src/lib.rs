//! An evaluator for Untyped Plutus Core.
//!
//! The crate decodes programs from their on-chain envelope, optionally
//! rewrites them with a set of observation-preserving optimizations, and
//! runs them on a budget-metered CEK machine as defined in the
//! [specification][spec].
//!
//! [spec]: https://plutus.cardano.intersectmbo.org/resources/plutus-core-spec.pdf
#![deny(clippy::undocumented_unsafe_blocks)]

use std::str::FromStr;

pub mod builtin;
pub mod constant;
pub mod cost;
pub mod data;
pub mod flat;
mod lex;
pub mod machine;
pub mod optimize;
pub mod program;
pub mod term;

pub use builtin::Builtin;
pub use constant::Constant;
pub use cost::{Budget, Parameters, Plutus};
pub use data::Data;
pub use machine::Error;
pub use program::Program;
pub use term::Term;

/// A De Bruijn index.
///
/// Indices are 1-based: `1` refers to the innermost enclosing binder. `0`
/// never refers to a binder and only appears in ill-formed programs.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeBruijn(pub u32);

/// The version triple carried by a program.
///
/// Major `1` is the only known major. Minor `1` introduced the `constr` and
/// `case` forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    /// The version used by Plutus V1 and V2 programs.
    pub const PLUTUS_V1_V2: Version = Version {
        major: 1,
        minor: 0,
        patch: 0,
    };
    /// The version used by Plutus V3 programs.
    pub const PLUTUS_V3: Version = Version {
        major: 1,
        minor: 1,
        patch: 0,
    };

    /// Whether the `constr` and `case` forms are available.
    pub fn has_datatypes(&self) -> bool {
        self.major == 1 && self.minor >= 1
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        let major = parts.next().and_then(|p| p.parse().ok()).ok_or(())?;
        let minor = parts.next().and_then(|p| p.parse().ok()).ok_or(())?;
        let patch = parts.next().and_then(|p| p.parse().ok()).ok_or(())?;
        if parts.next().is_some() {
            return Err(());
        }
        Ok(Version {
            major,
            minor,
            patch,
        })
    }
}
