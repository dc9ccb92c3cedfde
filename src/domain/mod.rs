pub mod digest;
pub mod item;

pub use digest::{DigestResult, Metadata, MetadataValue};
pub use item::ContentItem;
