pub mod block_listener;
pub mod pipeline;

pub use block_listener::{run_block_listener, Backoff, ListenerStats};
pub use pipeline::{process_block, BlockOutcome, PipelineConfig};
