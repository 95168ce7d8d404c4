mod server;
mod tracing;

pub use server::serve_stats;
pub use tracing::init_tracing;
