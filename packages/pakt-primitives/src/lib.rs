mod error;
mod exotic;
mod ident;
mod pattern;

pub use error::Error;
pub use exotic::ExoticRange;
pub use ident::Ident;
pub use pattern::{Pattern, PatternRange};
