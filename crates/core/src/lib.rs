//! Core shared types: decode errors, error sink, bounds, math re-exports.

pub use glam::{Vec3, vec3};

pub mod bounds;
pub mod error;
pub mod sink;

pub use bounds::Aabb;
pub use error::{DecodeError, DecodeResult, ErrorKind, alloc_zeroed};
pub use sink::{ErrorLog, ErrorRecord, ErrorSink};
