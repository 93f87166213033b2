//! Data shapes exchanged with HTTP clients.
//!
//! Nothing here is persisted by the gateway; every value is built from the
//! object store's responses and serialized as JSON via `serde`.

pub mod file;
