#[derive(thiserror::Error, Clone, Debug)]
pub enum Error {
    #[error("invalid pattern ({0})")]
    InvalidPattern(String),

    #[error(transparent)]
    Semver(#[from] pakt_semver::Error),
}
