pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_TURNS: u32 = 25;
pub const DEFAULT_DEADLINE_SECS: u64 = 300;
pub const DEFAULT_REST_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_TRACE_DIR: &str = "logs";
pub const DEFAULT_SUMMARY_INSTRUCTION: &str =
    "Provide a summary of the analysis conducted for the query: {query} based on the below messages";
