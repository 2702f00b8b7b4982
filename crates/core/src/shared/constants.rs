pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Low sampling temperature keeps the comparison factual.
pub const DEFAULT_TEMPERATURE: f64 = 0.1;

/// One worker reproduces the strictly sequential schedule.
pub const DEFAULT_WORKERS: usize = 1;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Media type assumed when an encoded image does not declare one.
pub const DEFAULT_MEDIA_TYPE: &str = "image/jpeg";

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const FALLBACK_API_KEY_ENV: &str = "API_KEY";

/// Answers the oracle may give instead of a JSON `null` when nothing matched.
pub const NO_MATCH_SENTINELS: &[&str] = &["", "null", "none", "unknown", "no match"];

pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp", "avif",
];
