//! Ready-made pipes for common pipelines.

mod auth;
mod metrics;
mod put_private;
mod tracing;

pub use auth::AuthPipe;
pub use metrics::MetricsPipe;
pub use put_private::PutPrivatePipe;
pub use self::tracing::TracingPipe;
