use serde::Deserialize;

/// Container extension assumed when the source does not report one.
pub const DEFAULT_EXTENSION: &str = "mp4";

/// Metadata for a remote video, resolved without downloading it.
///
/// `id` is the stable, opaque identifier used as the cache key.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct MediaInfo {
    pub id: String,
    #[serde(default = "default_extension")]
    pub ext: String,
    #[serde(default)]
    pub title: Option<String>,
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

impl MediaInfo {
    pub fn new(id: impl Into<String>, ext: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ext: ext.into(),
            title: None,
        }
    }

    /// File name of the cache entry: `<id>.<ext>`.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.id, self.ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        let info = MediaInfo::new("dQw4w9WgXcQ", "webm");
        assert_eq!(info.file_name(), "dQw4w9WgXcQ.webm");
    }

    #[test]
    fn test_deserialize_ignores_unknown_fields() {
        let json = r#"{"id": "abc123", "ext": "mkv", "title": "Clip", "duration": 12.5}"#;
        let info: MediaInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.id, "abc123");
        assert_eq!(info.ext, "mkv");
        assert_eq!(info.title.as_deref(), Some("Clip"));
    }

    #[test]
    fn test_deserialize_defaults_extension() {
        let info: MediaInfo = serde_json::from_str(r#"{"id": "abc123"}"#).unwrap();
        assert_eq!(info.ext, DEFAULT_EXTENSION);
        assert!(info.title.is_none());
    }

    #[test]
    fn test_deserialize_requires_id() {
        let result: Result<MediaInfo, _> = serde_json::from_str(r#"{"ext": "mp4"}"#);
        assert!(result.is_err());
    }
}
