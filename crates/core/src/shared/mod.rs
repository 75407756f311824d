pub mod collector_config;
pub mod constants;
pub mod face_box;
pub mod frame;
pub mod media_info;
