/// Flush period used when none (or zero) is configured, in milliseconds.
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 1000;

/// Name the transport registers under.
pub const TRANSPORT_NAME: &str = "SumoLogic";

/// Metadata key carrying the elapsed time of a profiled operation.
pub const DURATION_FIELD: &str = "durationMs";

pub const CONTENT_TYPE: &str = "text/plain";

/// Overrides the source name configured on the HTTP source.
pub const SUMO_NAME_HEADER: &str = "X-Sumo-Name";
/// Overrides the source host configured on the HTTP source.
pub const SUMO_HOST_HEADER: &str = "X-Sumo-Host";
/// Overrides the source category configured on the HTTP source.
pub const SUMO_CATEGORY_HEADER: &str = "X-Sumo-Category";
