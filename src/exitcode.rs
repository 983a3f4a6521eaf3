//! Standard exit codes (BSD sysexits.h compatible)

/// Command line usage error
pub const USAGE: i32 = 64;

/// Data format error (invalid import payload, rejected tree edit)
pub const DATAERR: i32 = 65;

/// Cannot open input (unknown document or file)
pub const NOINPUT: i32 = 66;

/// Service unavailable (generation backend)
pub const UNAVAILABLE: i32 = 69;

/// Internal software error
pub const SOFTWARE: i32 = 70;

/// Input/output error
pub const IOERR: i32 = 74;

/// Configuration error
pub const CONFIG: i32 = 78;
