//! # conduit-source
//!
//! Byte sources and the bounded streaming decoder for Conduit.
//!
//! A [`ByteSource`] opens a named source as a stream of transport chunks:
//! - [`HttpSource`]: `GET {base_url}/{source_id}` via reqwest
//! - [`FileSource`]: files under a local directory
//! - [`MemorySource`]: in-memory sources with an instrumented read log
//! - [`AnySource`]: one of the above, chosen from config
//!
//! A [`Decoder`] turns any byte source into a lazy, finite [`RecordStream`]
//! of [`Decoded`] lines under a bounded buffer, with `limit`/`skip` control.

mod any;
mod decoder;
mod error;
mod file;
mod http;
mod memory;
mod source;

pub use any::AnySource;
pub use decoder::{DecodeOptions, Decoded, Decoder, DecoderConfig, RecordStream};
pub use error::SourceError;
pub use file::FileSource;
pub use http::{HttpOptions, HttpSource, check_response};
pub use memory::{MemorySource, OpenRecord};
pub use source::{ByteSource, ByteStream};
