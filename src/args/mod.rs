//! CLI argument types and parsing helpers.
mod cli;
pub(crate) mod parsers;
mod types;

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod tests;

pub use cli::PushpollArgs;
pub use types::{OutputFormat, PositiveU64, PositiveUsize};
