/// Error code registry for the harness
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 4000-4999: Launch and process lifecycle errors
/// - 5000-5999: Result log errors
/// - 9000-9999: Other errors
#[allow(dead_code)]
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_PARSE_ERROR: u16 = 1007;
    pub const CONFIG_VALIDATION_FAILED: u16 = 1008;

    // Launch and lifecycle errors (4000-4999)
    pub const LAUNCH_GENERIC: u16 = 4000;
    pub const LAUNCH_EXECUTABLE_NOT_FOUND: u16 = 4001;
    pub const LAUNCH_CAPTURE_FILE: u16 = 4002;
    pub const LAUNCH_SPAWN_FAILED: u16 = 4007;
    pub const LAUNCH_ALREADY_STARTED: u16 = 4011;
    pub const PROCESS_FAILED: u16 = 4003;
    pub const PROCESS_NOT_STARTED: u16 = 4012;

    // Result log errors (5000-5999)
    pub const RESULTS_EMPTY: u16 = 5001;
    pub const RESULTS_SINK_REGISTERED: u16 = 5002;

    // Other errors (9000-9999)
    pub const OTHER_GENERIC: u16 = 9000;
    pub const OTHER_IO: u16 = 9001;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        1000 => "Generic configuration error",
        1001 => "Configuration file not found",
        1007 => "Failed to parse configuration",
        1008 => "Configuration validation failed",

        4000 => "Generic launch error",
        4001 => "Load generator executable not found",
        4002 => "Could not create output capture file",
        4007 => "Failed to spawn load generator",
        4011 => "Load generator was already started",
        4003 => "Load generator exited with non-zero code",
        4012 => "Load generator has not been started",

        5001 => "Load generator produced an empty results log",
        5002 => "A sample sink is already registered",

        9000 => "Generic error",
        9001 => "I/O error",

        _ => "Unknown error code",
    }
}
