pub mod ffmpeg_frame_sampler;
pub mod image_file_reader;
pub mod image_file_writer;
