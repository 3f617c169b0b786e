//! Limits and well-known names shared by the wizard crates.

/// Outbound used when nothing else is selected.
pub const DEFAULT_OUTBOUND_TAG: &str = "direct-out";

/// Route action (and pseudo-outbound) that rejects a connection.
pub const REJECT_ACTION: &str = "reject";

/// Reject method (and pseudo-outbound) that silently drops a connection.
pub const DROP_METHOD: &str = "drop";

/// Largest JSON document accepted from disk or the editor.
pub const MAX_JSON_CONFIG_SIZE: usize = 50 * 1024 * 1024;

/// Largest subscription body accepted from the network.
pub const MAX_SUBSCRIPTION_SIZE: usize = 10 * 1024 * 1024;

/// Longest accepted subscription URL or direct link.
pub const MAX_URI_LENGTH: usize = 8192;

/// Shortest accepted subscription URL or direct link.
pub const MIN_URI_LENGTH: usize = 10;

/// Longest accepted outbound tag.
pub const MAX_TAG_LENGTH: usize = 256;

/// Generated-node count above which previews show a summary instead.
pub const MAX_NODES_FOR_FULL_PREVIEW: usize = 20;

/// Lines of decoded content shown by a subscription check.
pub const MAX_PREVIEW_LINES: usize = 10;

/// Current ParserConfig schema version.
pub const PARSER_CONFIG_VERSION: u32 = 3;

/// Subscription reload interval filled in when none is configured.
pub const DEFAULT_RELOAD: &str = "4h";

/// Current wizard state file version.
pub const WIZARD_STATE_VERSION: u32 = 1;

/// File name of the current (unnamed) wizard state.
pub const STATE_FILE_NAME: &str = "state.json";

/// State files above this size are loaded with a warning.
pub const MAX_STATE_FILE_SIZE: u64 = 256 * 1024;
