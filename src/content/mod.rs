//! Article conversion and the on-disk library.
//!
//! [`convert`] turns a feed item into a markdown document with TOML front
//! matter; [`LibraryStore`] writes documents under
//! `{root}/{publication}/{article}.md` with atomic replace semantics.

mod convert;
mod store;

pub use convert::{convert, ArticleMeta, ConvertContext, ConvertError, ConvertedArticle};
pub use store::{LibraryStore, StoreError, StoredArticle};
