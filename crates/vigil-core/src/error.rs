//! Error types for the hardened command runner.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `RunnerError`.
pub type Result<T> = std::result::Result<T, RunnerError>;

/// Errors that can occur while validating, verifying, or planning a run.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Path is empty, relative, or otherwise unusable for safe file access.
    #[error("invalid file path {path}: {reason}")]
    InvalidFilePath {
        /// The offending path.
        path: PathBuf,
        /// Why the path was rejected.
        reason: String,
    },

    /// A path component or the leaf is a symbolic link.
    #[error("symlink in path: {path}")]
    IsSymlink {
        /// The component that resolved to a symlink.
        path: PathBuf,
    },

    /// The opened descriptor does not refer to a regular file.
    #[error("not a regular file: {path}")]
    NotRegularFile {
        /// The offending path.
        path: PathBuf,
    },

    /// A read exceeded the configured maximum size.
    #[error("file too large: {path} exceeds {max_size} bytes")]
    FileTooLarge {
        /// The file being read.
        path: PathBuf,
        /// The configured limit.
        max_size: u64,
    },

    /// Exclusive-create collision: the file already exists.
    #[error("file already exists: {path}")]
    FileExists {
        /// The existing file.
        path: PathBuf,
    },

    /// File or directory mode exceeds the caller-allowed mask.
    #[error("invalid permissions for {path}: {mode:#o} exceeds {max_mode:#o}")]
    InvalidPermissions {
        /// The offending path.
        path: PathBuf,
        /// The observed mode bits.
        mode: u32,
        /// The maximum allowed mode bits.
        max_mode: u32,
    },

    /// File or directory is owned by an unexpected principal.
    #[error("untrusted owner for {path}: uid {uid}")]
    UntrustedOwner {
        /// The offending path.
        path: PathBuf,
        /// The observed owner uid.
        uid: u32,
    },

    /// Running user is not a member of the group owning the path.
    #[error("running user is not in the owning group of {path}: gid {gid}")]
    UntrustedGroup {
        /// The offending path.
        path: PathBuf,
        /// The path's owning group id.
        gid: u32,
    },

    /// Path encoder rejected its input.
    #[error("cannot encode path {path:?}: {reason}")]
    InvalidPath {
        /// The rejected input.
        path: String,
        /// Why the input was rejected.
        reason: String,
    },

    /// Attempt to decode a hash-fallback name, which is not reversible.
    #[error("encoded name is a hash fallback and cannot be decoded: {name}")]
    FallbackNotReversible {
        /// The fallback name.
        name: String,
    },

    /// Encoded name is malformed and cannot be decoded.
    #[error("malformed encoded name: {name}")]
    InvalidEncodedName {
        /// The malformed name.
        name: String,
    },

    /// Recorded digest differs from the file's current digest.
    #[error("hash mismatch for {path}")]
    HashMismatch {
        /// The verified file.
        path: PathBuf,
        /// The recorded digest.
        expected: String,
        /// The freshly computed digest.
        actual: String,
    },

    /// No digest record exists for the file.
    #[error("no hash record for {path}")]
    MissingHash {
        /// The file without a record.
        path: PathBuf,
    },

    /// Variable name uses the reserved `__` prefix.
    #[error("variable name is reserved: {name}")]
    ReservedName {
        /// The reserved name.
        name: String,
    },

    /// Variable or environment name fails the identifier rules.
    #[error("invalid variable name: {name:?}")]
    InvalidVariableName {
        /// The rejected name.
        name: String,
    },

    /// Variable name resolves to a different scope than required.
    #[error("variable {name} is {actual}-scoped, expected {expected}")]
    ScopeMismatch {
        /// The variable name.
        name: String,
        /// The scope the operation required.
        expected: &'static str,
        /// The scope the name resolves to.
        actual: &'static str,
    },

    /// Lookup of a global variable found no definition.
    #[error("undefined global variable: {name}")]
    UndefinedGlobal {
        /// The missing name.
        name: String,
    },

    /// Lookup of a local variable found no definition.
    #[error("undefined local variable: {name}")]
    UndefinedLocal {
        /// The missing name.
        name: String,
    },

    /// Environment value matched a dangerous pattern.
    #[error("unsafe environment value for {name}: matched {pattern:?}")]
    UnsafeEnvVar {
        /// The environment variable name.
        name: String,
        /// The dangerous pattern that matched.
        pattern: String,
    },

    /// Expansion referenced a variable that is not defined anywhere.
    #[error("variable not found: {name}")]
    VariableNotFound {
        /// The missing name.
        name: String,
    },

    /// Expansion referenced an environment variable outside the allowlist.
    #[error("environment variable not allowed: {name}")]
    VariableNotAllowed {
        /// The disallowed name.
        name: String,
    },

    /// A `${` reference was never closed.
    #[error("unclosed variable reference in {input:?}")]
    UnclosedVariable {
        /// The input containing the unclosed reference.
        input: String,
    },

    /// A `$` was not followed by `{`.
    #[error("invalid variable format in {input:?}")]
    InvalidVariableFormat {
        /// The input containing the bare `$`.
        input: String,
    },

    /// A backslash escape other than `\$` or `\\`.
    #[error("invalid escape sequence: \\{sequence}")]
    InvalidEscapeSequence {
        /// The character following the backslash.
        sequence: char,
    },

    /// Variable expansion revisited a name already on the resolution path.
    #[error("circular variable reference: {name}")]
    CircularReference {
        /// The name that closed the cycle.
        name: String,
    },

    /// Expansion of a batch entry failed.
    #[error("expansion failed at index {index}: {source}")]
    BatchExpansion {
        /// Zero-based index of the failing entry.
        index: usize,
        /// The underlying expansion error.
        #[source]
        source: Box<RunnerError>,
    },

    /// No template registered under the requested name.
    #[error("template not found: {name}")]
    TemplateNotFound {
        /// The unknown template name.
        name: String,
    },

    /// A `{{.var}}` reference names a variable with no definition.
    #[error("undefined template variable: {name}")]
    UndefinedVariable {
        /// The missing variable name.
        name: String,
    },

    /// Template variables reference each other in a cycle.
    #[error("circular template dependency involving {name}")]
    CircularDependency {
        /// A variable on the cycle.
        name: String,
    },

    /// Template text is not a valid minimal template.
    #[error("invalid template: {reason}")]
    InvalidTemplate {
        /// What the parser objected to.
        reason: String,
    },

    /// A command classified above the acceptable risk level.
    #[error("command {command} is {level} risk, above the {max} limit")]
    RiskLimitExceeded {
        /// The offending command's name.
        command: String,
        /// The level the command classified at.
        level: String,
        /// The configured ceiling.
        max: String,
    },

    /// One or more requested groups do not exist in the configuration.
    #[error("group(s) not found: {}; available: {}", missing.join(", "), available.join(", "))]
    GroupNotFound {
        /// Requested names with no matching group, deduplicated.
        missing: Vec<String>,
        /// Names of all configured groups, deduplicated.
        available: Vec<String>,
    },

    /// Operation requires a configuration but none was supplied.
    #[error("no configuration loaded")]
    NilConfig,

    /// Configuration failed validation.
    #[error("configuration validation failed: {reason}")]
    ConfigValidationFailed {
        /// The first violation encountered.
        reason: String,
    },
}
