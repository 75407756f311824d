pub mod yt_dlp_source;
