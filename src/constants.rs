// Column names
pub const DEFAULT_VALUE_COLUMN: &str = "series_value";
pub const SERIES_NAME_COLUMN: &str = "series_name";

// Long-format output of the TSF converter
pub const LONG_ID_COLUMN: &str = "id";
pub const LONG_TIMESTAMP_COLUMN: &str = "timestamp";
pub const LONG_VALUE_COLUMN: &str = "value";

// TSF parsing
pub const TSF_DATE_FORMAT: &str = "%Y-%m-%d %H-%M-%S";
pub const TSF_MISSING_TOKEN: &str = "?";

// Split defaults
pub const DEFAULT_TRAIN_FRACTION: f64 = 0.7;
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

// Windowing defaults
pub const DEFAULT_WINDOW_TIMESTAMP_COLUMN: &str = "Date/Time";
pub const DEFAULT_TARGET_COLUMN: &str = "Close";
pub const DEFAULT_ANCHOR_TIME: (u32, u32, u32) = (14, 46, 0); // Scheduled matching
pub const DEFAULT_HISTORY_ROWS: usize = 223; // 9:15-11:29 and 13:00-14:29
pub const DEFAULT_LAGGED_ANCHORS: usize = 2;
pub const DEFAULT_WINDOW_TRAIN_FRACTION: f64 = 0.8;

// Model parameters
pub const DEFAULT_HIDDEN_SIZE: usize = 64;
pub const DEFAULT_NUM_LAYERS: usize = 2;
pub const DEFAULT_DROPOUT: f64 = 0.2;
pub const HEAD_HIDDEN_1: usize = 64;
pub const HEAD_HIDDEN_2: usize = 32;
