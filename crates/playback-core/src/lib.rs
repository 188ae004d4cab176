//! Segment scheduling, ABR selection, and timeline indexing for adaptive
//! streaming playback.
//!
//! This crate implements the buffer-management core of an adaptive
//! bitrate player: given a manifest already parsed into [`timeline`]
//! entries, a [`sink::MediaSink`] to append to, and a [`fetch::FetchPipeline`]
//! to pull segment bytes from, it decides what to fetch next, which
//! representation to fetch it at, and when to evict old data. Manifest
//! parsing, DRM, HTTP transport, and native media source implementations
//! are supplied by the host application through the traits in [`sink`]
//! and [`fetch`].

pub mod abr;
pub mod buffered_range;
pub mod clock;
pub mod config;
pub mod error;
pub mod fetch;
pub mod gc;
pub mod media_type;
pub mod representation;
pub mod scheduler;
pub mod sink;
pub mod timeline;

pub use error::PlayerError;
pub use media_type::MediaType;
pub use representation::{Adaptation, Representation};
