mod error;
mod extract;
mod range;
mod version;

pub use error::Error;
pub use range::{OperatorType, Range, RangeKind, Token, TokenType};
pub use version::{Version, VersionRc};
