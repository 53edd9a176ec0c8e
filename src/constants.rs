// Constants shared across multiple modules

// X11 font
pub const FONT_NAME: &str = "-misc-fixed-medium-r-normal--13-120-75-75-c-70-iso8859-1";

// Colors for the status window and the pointer-hold screen
pub const BG_COLOR: u32 = 0x282828; // Dark gray background
pub const TEXT_COLOR: u32 = 0xebdbb2; // Light text color
pub const HEADER_COLOR: u32 = 0xfabd2f; // Yellow for the header line
pub const BUTTON_COLOR: u32 = 0x83a598; // Blue for button labels
pub const ALERT_COLOR: u32 = 0xcc0000; // Red for the hold-screen message
pub const MARKER_COLOR: u32 = 0xb8bb26; // Green for the nearest-event marker

// Default prayer-times endpoint; the response body is free-form text and
// times are extracted by pattern matching
pub const API_URL: &str = "https://prayer.aviny.com/api/prayertimes/11";

// Time-of-day token, HH:MM with optional seconds
pub const TIME_PATTERN: &str = r"\b([0-1]?\d|2[0-3]):[0-5]\d(?::[0-5]\d)?\b";

pub const FETCH_TIMEOUT_SECS: u64 = 10;
pub const UI_TICK_MILLIS: u64 = 1000;

// In-memory log pane
pub const LOG_CAPACITY: usize = 100;
pub const LOG_VISIBLE_LINES: usize = 8;
