pub mod error;
pub mod types;

pub use error::{MaintError, Result};
pub use types::{Document, DocumentRef, Fields, Identity};
