//! HTTP polling engine (component C4): conditional requests, adaptive
//! update intervals, exponential back-off, rate-limit bucket tracking, and
//! per-endpoint state.

mod delay;
mod endpoint;
mod engine;
mod error;
mod interval;
mod ratelimit;
mod response;
mod session;

pub use delay::Delay;
pub use endpoint::EndpointState;
pub use engine::{HttpEngine, RetryPolicy};
pub use error::HttpError;
pub use interval::{decide_on_update_interval, IntervalContext, HIGHEST_UPDATE_INTERVAL_CAP};
pub use ratelimit::RateLimitBucket;
pub use response::Response;
pub use session::{Session, SessionStore};
