//! `.luaurc` loading and flag precedence

use std::fs;
use std::path::{Path, PathBuf};

use luau_checker::{Limits, Mode, SolverKind};
use serde::Deserialize;

use crate::error::ConfigError;

pub const CONFIG_FILE: &str = ".luaurc";

/// Contents of a `.luaurc` file. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LuauRc {
    pub language_mode: Option<Mode>,
    pub solver: Option<SolverKind>,
    pub lint: Option<bool>,
    pub max_solver_iterations: Option<usize>,
}

impl LuauRc {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The explicit `--config` file, else `.luaurc` in `dir` when present
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let default: PathBuf = dir.join(CONFIG_FILE);
        if default.is_file() {
            tracing::debug!(path = %default.display(), "using config file");
            Self::load(&default)
        } else {
            Ok(Self::default())
        }
    }
}

/// Effective settings for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub mode: Mode,
    pub solver: SolverKind,
    pub lint: bool,
    pub limits: Limits,
}

impl Settings {
    /// Command line flags win over the config file, which wins over defaults
    pub fn resolve(rc: &LuauRc, mode: Option<Mode>, solver: Option<SolverKind>, no_lint: bool) -> Self {
        Self {
            mode: mode.or(rc.language_mode).unwrap_or_default(),
            solver: solver.or(rc.solver).unwrap_or_default(),
            lint: !no_lint && rc.lint.unwrap_or(true),
            limits: Limits {
                max_solver_iterations: rc
                    .max_solver_iterations
                    .unwrap_or(Limits::default().max_solver_iterations),
                ..Limits::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_luaurc() {
        let rc: LuauRc = serde_json::from_str(r#"{"languageMode": "strict", "solver": "old", "globals": []}"#).unwrap();
        assert_eq!(
            rc,
            LuauRc {
                language_mode: Some(Mode::Strict),
                solver: Some(SolverKind::Old),
                lint: None,
                max_solver_iterations: None,
            }
        );
    }

    #[test]
    fn test_flags_override_file() {
        let rc = LuauRc {
            language_mode: Some(Mode::Strict),
            solver: Some(SolverKind::Old),
            lint: Some(false),
            max_solver_iterations: Some(500),
        };
        let settings = Settings::resolve(&rc, Some(Mode::NoCheck), None, false);
        assert_eq!(
            settings,
            Settings {
                mode: Mode::NoCheck,
                solver: SolverKind::Old,
                lint: false,
                limits: Limits {
                    max_solver_iterations: 500,
                    ..Limits::default()
                },
            }
        );
        let defaults = Settings::resolve(&LuauRc::default(), None, None, false);
        assert_eq!(defaults.mode, Mode::Nonstrict);
        assert_eq!(defaults.solver, SolverKind::New);
        assert!(defaults.lint);
        assert_eq!(defaults.limits, Limits::default());
    }

    #[test]
    fn test_discover() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(LuauRc::discover(None, dir.path()).unwrap(), LuauRc::default());

        std::fs::write(dir.path().join(CONFIG_FILE), r#"{"languageMode": "nocheck"}"#).unwrap();
        let rc = LuauRc::discover(None, dir.path()).unwrap();
        assert_eq!(rc.language_mode, Some(Mode::NoCheck));

        let missing = dir.path().join("other.json");
        assert!(matches!(
            LuauRc::discover(Some(&missing), dir.path()),
            Err(ConfigError::Read { .. })
        ));

        std::fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();
        assert!(matches!(
            LuauRc::discover(None, dir.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
