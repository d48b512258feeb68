//! Session-wide checking configuration

use luau_checker::{CheckOptions, Limits, Mode, SolverKind};
use serde::{Deserialize, Serialize};

/// Strictness mode and solver choice shared by every module of a session.
/// Changing either field invalidates all cached results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfigState {
    pub mode: Mode,
    pub solver: SolverKind,
}

impl ConfigState {
    pub fn new(mode: Mode, solver: SolverKind) -> Self {
        Self { mode, solver }
    }

    /// Options for one module check under this configuration
    pub fn check_options(&self, lint: bool, limits: Limits) -> CheckOptions {
        CheckOptions {
            mode: self.mode,
            solver: self.solver,
            lint,
            limits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ConfigState::default();
        assert_eq!(config.mode, Mode::Nonstrict);
        assert_eq!(config.solver, SolverKind::New);
    }

    #[test]
    fn test_serializes_lowercase_names() {
        let config = ConfigState::new(Mode::Strict, SolverKind::Old);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"mode":"strict","solver":"old"}"#);
    }
}
