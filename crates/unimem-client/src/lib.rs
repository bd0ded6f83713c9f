//! Unified memory client.
//!
//! Talks to a same-host Local memory service and the cloud Platform memory
//! API through one canonical interface. The [`UnifiedMemoryClient`] router
//! picks a backend per call from the feature flags, retries transient
//! failures in the shared [`transport`] and falls back to Local when allowed.

pub mod backend;
pub mod cache;
pub mod config;
pub mod events;
pub mod flags;
pub mod interceptor;
pub mod local;
pub mod platform;
pub mod retry;
pub mod router;
pub mod stats;
pub mod transform;
pub mod transport;
pub mod validate;

pub use backend::MemoryBackend;
pub use config::load_config;
pub use local::LocalClient;
pub use platform::PlatformClient;
pub use retry::RetryPolicy;
pub use router::{BackendHealth, UnifiedMemoryClient};
pub use stats::ClientStats;
