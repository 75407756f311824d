pub mod frame_sampler;
pub mod image_reader;
pub mod image_writer;
