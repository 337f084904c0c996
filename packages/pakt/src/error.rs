use std::sync::Arc;

use pakt_primitives::Ident;

/// The candidate set that made a constraint unsatisfiable, kept around so
/// the caller can render a useful diagnostic instead of a bare "no match".
#[derive(Clone, Debug)]
pub struct ConstraintFailure {
    pub name: Ident,
    pub range: String,
    pub candidates: Vec<String>,
}

#[derive(thiserror::Error, Clone, Debug)]
pub enum Error {
    #[error("{0}")]
    UserError(String),

    #[error("no version of {} satisfies {} (candidates: {})", .0.name, .0.range, .0.candidates.join(", "))]
    ConstraintError(ConstraintFailure),

    #[error("network error ({0})")]
    NetworkError(Arc<reqwest::Error>),

    #[error("process {command} exited with code {code}")]
    ProcessTermError { command: String, code: i32 },

    #[error("unexpected error ({0})")]
    UnexpectedError(String),

    #[error("i/o error ({0})")]
    IoError(#[from] Arc<std::io::Error>),

    #[error("invalid JSON ({0})")]
    InvalidJson(#[from] Arc<serde_json::Error>),

    #[error("invalid TOML ({0})")]
    InvalidToml(#[from] Arc<toml::de::Error>),

    #[error(transparent)]
    Semver(#[from] pakt_semver::Error),

    #[error(transparent)]
    Pattern(#[from] pakt_primitives::Error),

    #[error("invalid mutex specifier ({0})")]
    InvalidMutexSpecifier(String),

    #[error("duplicate workspace name ({0})")]
    DuplicateWorkspaceName(Ident),

    #[error("workspace manifest is missing a name or version ({0})")]
    IncompleteWorkspaceManifest(String),

    #[error("a private:false manifest declares workspaces ({0})")]
    NonPrivateWorkspaceRoot(String),

    #[error("workspaces.nohoist is set but the nohoist feature is disabled ({0})")]
    NohoistFeatureDisabled(String),

    #[error("--focus is invalid at the workspace root itself ({0})")]
    FocusAtWorkspaceRoot(String),

    #[error("--frozen-lockfile requires an up-to-date lockfile, but {0} would change")]
    FrozenLockfileViolation(String),
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::IoError(Arc::new(error))
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::InvalidJson(Arc::new(error))
    }
}

impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::InvalidToml(Arc::new(error))
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Error::NetworkError(Arc::new(error))
    }
}

impl Error {
    /// Exit code the outer driver should use when this error terminates the
    /// run; process errors pass their own exit code through, everything
    /// else maps to the generic failure code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ProcessTermError { code, .. } => *code,
            _ => 1,
        }
    }
}
