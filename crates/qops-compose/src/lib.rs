pub mod discover;
pub mod error;
pub mod interpolate;
pub mod loader;
pub mod parse;

pub use discover::*;
pub use error::*;
pub use interpolate::*;
pub use loader::*;
pub use parse::{merge_documents, parse_document};
