pub mod config;
pub mod error;
pub mod frame;
pub mod path;
pub mod source;
pub mod testing;
pub mod types;
pub mod window;

pub use error::{Service, SourceError};
pub use source::{IssueSource, SourceRepository};
pub use types::*;
