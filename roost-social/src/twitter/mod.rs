//! Twitter/X retrieval surface.
//!
//! - [`fetcher`]: the `Fetcher` collaborator and its HTTP-backed implementation
//! - [`requests`]: URL builders and the search [`TweetFilter`]
//! - [`types`]: `Tweet`, `User`, `Entity`, `Cursor` and `Page`
//! - [`service`]: `TweetService`, one operation per content shape
pub mod fetcher;
pub mod requests;
pub mod service;
pub mod types;

pub use fetcher::{Credentials, FetchError, Fetcher, HttpFetcher};
pub use requests::TweetFilter;
pub use service::TweetService;
pub use types::{Cursor, Entity, EntityKind, FromRaw, Page, Tweet, User};
