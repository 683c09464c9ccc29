pub mod client;
pub mod limiter;
pub mod result;

pub use client::{DepthFusionClient, DepthService, HttpDepthService};
pub use limiter::RateLimiter;
pub use result::{DepthEstimate, FusedPose, FusionError, FusionResult};
