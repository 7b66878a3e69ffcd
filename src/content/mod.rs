//! Attachment content storage
//!
//! Downloaded attachment bytes live outside the record store. The record
//! store only keeps a [`Locator`] for each completed attachment; this module
//! owns the bytes behind it.
//!
//! ## Architecture
//!
//! The core abstraction is the [`ContentStore`] trait. The provided
//! implementation, [`FsContentStore`], keeps one flat file per attachment in a
//! configured directory. New content is staged under a hidden name until it
//! is committed, so a half-written transfer is never mistaken for a download.
//! [`InFlightContent`] tracks staged locators that a running task still owns.
//!
//! ## Usage
//!
//! ```no_run
//! use alertbox::content::{ContentStore, FsContentStore};
//! use tokio::io::AsyncWriteExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = FsContentStore::new("./attachments").await?;
//!
//!     let mut pending = store.open_write("photo.jpg", Some("image/jpeg")).await?;
//!     pending.writer.write_all(b"...").await?;
//!     pending.writer.shutdown().await?;
//!     store.commit(&pending.locator).await?;
//!
//!     assert!(store.exists(&pending.locator).await);
//!     store.delete(&pending.locator).await?;
//!     Ok(())
//! }
//! ```

mod fs;
mod in_flight;
mod traits;

pub use fs::FsContentStore;
pub use in_flight::{InFlightContent, InFlightGuard};
pub use traits::{ContentEntry, ContentReader, ContentStore, Locator, PendingContent};
