pub mod cache;
pub mod detection;
pub mod pipeline;
pub mod shared;
pub mod source;
pub mod video;
