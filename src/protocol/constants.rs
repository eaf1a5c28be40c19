//! Wire protocol constants

/// Request field carrying the client identity
pub const FIELD_UUID: &str = "UUID";

/// Request field carrying the action name
pub const FIELD_ACTION: &str = "ACTION";

/// Request field carrying the record key
pub const FIELD_ID: &str = "ID";

/// Key field of every stored record
pub const RECORD_KEY: &str = "id";

/// Frame terminator
pub const FRAME_DELIMITER: u8 = b'\n';

/// Largest frame accepted before the connection is dropped (1MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Bytes reserved in the framing buffer before each socket read
pub const READ_CHUNK_SIZE: usize = 4096;

// Error messages sent to clients
pub const MSG_MISSING_UUID_OR_ACTION: &str = "Missing UUID or ACTION";
pub const MSG_ITEM_NOT_FOUND: &str = "Item not found";
pub const MSG_MISSING_ID_FOR_SET: &str = "Missing ID for set operation";
pub const MSG_FAILED_TO_SET: &str = "Failed to set item";
pub const MSG_FAILED_TO_LIST: &str = "Failed to list items";
pub const MSG_FAILED_TO_GET: &str = "Failed to get item";
pub const MSG_UNKNOWN_ACTION: &str = "Unknown ACTION";
pub const MSG_INVALID_JSON: &str = "Invalid JSON";
