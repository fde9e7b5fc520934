/*!
 * Monitoring
 * Operational logging setup
 */

mod tracer;

pub use tracer::{init_tracing, TraceFormat};
