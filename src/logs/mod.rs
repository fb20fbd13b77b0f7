pub mod aggregator;
pub mod constants;
pub mod enricher;
pub mod entry;
pub mod failure;
pub mod flusher;
pub mod profiler;
pub mod sender;
pub mod shipper;
