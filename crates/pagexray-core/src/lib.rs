pub mod asset;
pub mod convert;
pub mod enrich;
pub mod error;
pub mod har;
pub mod headers;
pub mod page;
pub mod party;
pub mod redirect;
pub mod stats;

pub use convert::{ConvertConfig, convert};
pub use error::{Error, Result};
pub use page::PageSummary;
