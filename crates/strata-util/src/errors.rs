use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all Strata operations.
///
/// The first four variants are configuration failures detected during a
/// resolution pass. They abort the pass before any task executes.
#[derive(Debug, Error, Diagnostic)]
pub enum StrataError {
    /// Two fragments at the same precedence level disagree on an option.
    #[error("Conflicting values for option `{option}` at the same precedence level: {}", scopes.join(", "))]
    #[diagnostic(
        code(strata::config_conflict),
        help("Give one of the fragments a higher `rank`, or move the value to a different layer")
    )]
    ConfigConflict { option: String, scopes: Vec<String> },

    /// No version satisfies every constraint declared for a library.
    #[error("No version of `{library}` satisfies the constraints declared by: {}", scopes.join(", "))]
    #[diagnostic(code(strata::unsatisfiable_constraint))]
    UnsatisfiableConstraint { library: String, scopes: Vec<String> },

    /// The task predecessor relation contains a cycle.
    #[error("Cyclic task dependency: {}", cycle.join(" -> "))]
    #[diagnostic(code(strata::cyclic_dependency))]
    CyclicDependency { cycle: Vec<String> },

    /// A required option was supplied by no fragment and has no default.
    #[error("Missing required option `{option}` for target `{target}`")]
    #[diagnostic(
        code(strata::missing_required_option),
        help("Set it in [defaults], the module's options, or a variant")
    )]
    MissingRequiredOption { option: String, target: String },

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed build definition (e.g. Strata.toml).
    #[error("Manifest error: {message}")]
    #[diagnostic(help("Check your Strata.toml for syntax errors"))]
    Manifest { message: String },

    /// Fragments were malformed or supplied out of precedence order.
    #[error("Fragment error: {message}")]
    Fragment { message: String },

    /// An option holds a value of the wrong type or breaks a cross-option rule.
    #[error("Invalid option `{option}`: {message}")]
    InvalidOption { option: String, message: String },

    /// A version or version requirement could not be parsed.
    #[error("Invalid version `{input}`: {message}")]
    Version { input: String, message: String },

    /// A task declaration is malformed or references an unknown task.
    #[error("Task error: {message}")]
    Task { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type StrataResult<T> = miette::Result<T>;
