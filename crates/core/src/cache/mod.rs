pub mod video_cache;
