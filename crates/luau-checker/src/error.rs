//! Type errors reported by the solvers

use luau_ast::Span;
use thiserror::Error;

/// A type error with the source span it is reported at
#[derive(Debug, Clone, PartialEq)]
pub struct TypeError {
    pub kind: TypeErrorKind,
    pub span: Span,
}

impl TypeError {
    pub fn new(kind: TypeErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypeErrorKind {
    #[error("Type '{given}' could not be converted into '{wanted}'")]
    TypeMismatch { wanted: String, given: String },

    #[error("Unknown global '{name}'")]
    UnknownGlobal { name: String },

    #[error("Key '{key}' not found in table '{table}'")]
    UnknownProperty { key: String, table: String },

    #[error("Type '{ty}' does not have key '{key}'")]
    NoSuchKey { key: String, ty: String },

    #[error("Cannot add property '{key}' to table '{table}'")]
    CannotExtendTable { key: String, table: String },

    #[error("Value of type '{ty}' could be nil")]
    OptionalValueAccess { ty: String },

    #[error("{}", count_mismatch_message(.min, .max, .actual))]
    CountMismatch {
        min: usize,
        max: Option<usize>,
        actual: usize,
    },

    #[error("Cannot call non-function {ty}")]
    NotCallable { ty: String },

    #[error("Operator '{op}' could not be applied to type '{ty}'")]
    OperatorNotApplicable { op: String, ty: String },

    #[error("Unknown require: {path}")]
    UnknownRequire { path: String },

    #[error("Cyclic module dependency: {cycle}")]
    CyclicModule { cycle: String },

    #[error("Module '{module}' does not return exactly 1 value")]
    ModuleReturnCount { module: String },

    #[error("Unknown type '{name}'")]
    UnknownType { name: String },

    #[error("Generic type '{name}' expects {expected} type argument{}, but {actual} {} specified", plural(.expected), verb(.actual))]
    GenericArgCount {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Code too complex to typecheck! Consider adding type annotations around this area")]
    CodeTooComplex,
}

impl TypeErrorKind {
    /// Stable diagnostic code
    pub fn code(&self) -> &'static str {
        match self {
            TypeErrorKind::TypeMismatch { .. } => "TypeMismatch",
            TypeErrorKind::UnknownGlobal { .. } => "UnknownSymbol",
            TypeErrorKind::UnknownProperty { .. } => "UnknownProperty",
            TypeErrorKind::NoSuchKey { .. } => "UnknownProperty",
            TypeErrorKind::CannotExtendTable { .. } => "CannotExtendTable",
            TypeErrorKind::OptionalValueAccess { .. } => "OptionalValueAccess",
            TypeErrorKind::CountMismatch { .. } => "CountMismatch",
            TypeErrorKind::NotCallable { .. } => "CannotCallNonFunction",
            TypeErrorKind::OperatorNotApplicable { .. } => "OperatorNotApplicable",
            TypeErrorKind::UnknownRequire { .. } => "UnknownRequire",
            TypeErrorKind::CyclicModule { .. } => "ModuleHasCyclicDependency",
            TypeErrorKind::ModuleReturnCount { .. } => "IllegalRequire",
            TypeErrorKind::UnknownType { .. } => "UnknownSymbol",
            TypeErrorKind::GenericArgCount { .. } => "IncorrectGenericParameterCount",
            TypeErrorKind::CodeTooComplex => "CodeTooComplex",
        }
    }
}

fn plural(n: &usize) -> &'static str {
    if *n == 1 {
        ""
    } else {
        "s"
    }
}

fn verb(n: &usize) -> &'static str {
    if *n == 1 {
        "is"
    } else {
        "are"
    }
}

fn count_mismatch_message(min: &usize, max: &Option<usize>, actual: &usize) -> String {
    let (min, actual) = (*min, *actual);
    let expected = match *max {
        Some(max) if max != min => format!("{} to {} arguments", min, max),
        Some(_) => format!("{} argument{}", min, plural(&min)),
        None => format!("at least {} argument{}", min, plural(&min)),
    };
    let given = match actual {
        0 => "none are specified".to_string(),
        1 => "1 is specified".to_string(),
        n => format!("{} are specified", n),
    };
    format!(
        "Argument count mismatch. Function expects {}, but {}",
        expected, given
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_message() {
        let kind = TypeErrorKind::TypeMismatch {
            wanted: "number".to_string(),
            given: "string".to_string(),
        };
        assert_eq!(kind.to_string(), "Type 'string' could not be converted into 'number'");
    }

    #[test]
    fn test_count_mismatch_messages() {
        let exact = TypeErrorKind::CountMismatch { min: 1, max: Some(1), actual: 2 };
        assert_eq!(
            exact.to_string(),
            "Argument count mismatch. Function expects 1 argument, but 2 are specified"
        );
        let range = TypeErrorKind::CountMismatch { min: 1, max: Some(3), actual: 0 };
        assert_eq!(
            range.to_string(),
            "Argument count mismatch. Function expects 1 to 3 arguments, but none are specified"
        );
    }
}
