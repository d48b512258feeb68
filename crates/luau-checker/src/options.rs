//! Checking modes, solver selection and resource limits

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How strictly unannotated code is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Strict,
    #[default]
    Nonstrict,
    NoCheck,
}

impl Mode {
    /// Integer encoding used by the request protocol: 0 Nonstrict,
    /// 1 Strict, 2 NoCheck. Anything else falls back to Nonstrict.
    pub fn from_protocol(value: i64) -> Mode {
        match value {
            1 => Mode::Strict,
            2 => Mode::NoCheck,
            _ => Mode::Nonstrict,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Strict => "strict",
            Mode::Nonstrict => "nonstrict",
            Mode::NoCheck => "nocheck",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Mode::Strict),
            "nonstrict" => Ok(Mode::Nonstrict),
            "nocheck" => Ok(Mode::NoCheck),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

/// Which type inference algorithm runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    /// Constraint generation plus a worklist solver
    #[default]
    New,
    /// Single forward pass with eager unification
    Old,
}

impl SolverKind {
    pub fn from_flag(use_new: bool) -> SolverKind {
        if use_new {
            SolverKind::New
        } else {
            SolverKind::Old
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SolverKind::New => "new",
            SolverKind::Old => "old",
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SolverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "new" => Ok(SolverKind::New),
            "old" => Ok(SolverKind::Old),
            other => Err(format!("unknown solver '{}'", other)),
        }
    }
}

/// Bounds on pathological inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum nesting depth when comparing or copying types
    pub max_type_depth: usize,
    /// Maximum constraint dispatch attempts per module
    pub max_solver_iterations: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_type_depth: 100,
            max_solver_iterations: 20_000,
        }
    }
}

/// Options for checking one module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
    pub mode: Mode,
    pub solver: SolverKind,
    /// Run lint passes after inference
    pub lint: bool,
    pub limits: Limits,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            solver: SolverKind::default(),
            lint: true,
            limits: Limits::default(),
        }
    }
}
