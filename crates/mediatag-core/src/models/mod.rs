//! Data models shared by the pipeline, the stores and the HTTP surface.

mod job;
mod media;
mod search;

pub use job::*;
pub use media::*;
pub use search::*;
