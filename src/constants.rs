// Shootkit Constants
// Naming and proxy conventions shared with the archive. Downstream tools parse these names.

// Platform artifacts skipped during every walk
pub const DS_STORE: &str = ".DS_Store";

// Canonical naming
pub const SEQUENCE_WIDTH: usize = 4;
// Largest sequence that still fits SEQUENCE_WIDTH digits
pub const SEQUENCE_LIMIT: u32 = 9_999;
pub const TEMP_FILE_PREFIX: &str = ".shootkit-staging-";

// Proxy tree
pub const PROXY_MONTH_SUFFIX: &str = "_proxy";
pub const PROXY_SHOOT_SUFFIX: &str = ".proxy";
pub const LEGACY_PROXY_SUFFIX: &str = "_proxy";
pub const OMITTED_FILES_NAME: &str = "omitted_files.txt";
pub const PROXY_ONE_SUFFIX: &str = "-compressed";

// Video proxy encode settings
pub const PROXY_WIDTH: u32 = 1920;
pub const PROXY_VIDEO_CODEC: &str = "libx264";
pub const PROXY_PIX_FMT: &str = "yuv420p";
pub const PROXY_PRESET: &str = "slow";
pub const PROXY_CRF: u32 = 28;

// Image proxy output
pub const IMAGE_PROXY_EXTENSION: &str = "jpg";

// Proxy classification (lowercase, no dot)
pub const PROXY_VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "mov", "m4v"];
pub const PROXY_COMPRESS_IMAGE_EXTENSIONS: [&str; 3] = ["png", "tiff", "cr2"];
pub const PROXY_PASSTHROUGH_EXTENSIONS: [&str; 7] = [
    "jpg", "jpeg", "gif", "drp", "aac", "wav", "mp3"
];

// Probe classification (lowercase, no dot)
pub const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "mov", "avi", "mkv", "m4v"];
pub const AUDIO_EXTENSIONS: [&str; 6] = ["mp3", "wav", "aac", "flac", "m4a", "aiff"];
pub const IMAGE_EXTENSIONS: [&str; 7] = [
    "cr2", "jpg", "jpeg", "png", "tiff", "dng", "heif"
];

// Name check
pub const DEFAULT_EXCLUDED_DEVICE_MARKERS: [&str; 2] = ["garageband", "hijack"];
pub const NAME_CHECK_IGNORED_EXTENSION: &str = "txt";

// Hashing
pub const HASH_CHUNK_SIZE: usize = 1_048_576; // 1MB

// Sizes are reported in decimal gigabytes
pub const BYTES_PER_GB: f64 = 1_000_000_000.0;

// Catalog
pub const CATALOG_FILENAME: &str = "catalog.db";
pub const SETTINGS_FILENAME: &str = "settings.json";
pub const APP_QUALIFIER: &str = "";
pub const APP_ORGANIZATION: &str = "";
pub const APP_NAME: &str = "shootkit";

// Defaults
pub const DEFAULT_PROXY_ROOT: &str = "proxy";
pub const DEFAULT_VOLUMES_ROOT: &str = "/Volumes";

// Tool polling interval while waiting on a child with a timeout
pub const TOOL_POLL_INTERVAL_MS: u64 = 100;
