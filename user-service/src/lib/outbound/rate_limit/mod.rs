pub mod limiter;
pub mod redis;

pub use limiter::CounterStore;
pub use limiter::IpRateLimiter;
pub use limiter::RateLimitError;
pub use limiter::RateLimitPolicy;
pub use redis::RedisCounterStore;
