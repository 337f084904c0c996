#[derive(thiserror::Error, Clone, Debug)]
pub enum Error {
    #[error("invalid semver version ({0})")]
    InvalidVersion(String),

    #[error("invalid semver range ({0})")]
    InvalidRange(String),
}
