//! Social network clients and extractors used by Roost.
//!
//! Only the Twitter/X web API is implemented. [`twitter::TweetService`] turns one
//! raw, deeply nested response into a typed page plus the cursor for the next one.
pub mod twitter;
