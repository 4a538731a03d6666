//! Adapters for generic ports.

mod navigator;
mod reqwest_client;
mod system_clock;
mod user_cache;

pub use navigator::ChannelNavigator;
pub use reqwest_client::{ReqwestHttpClient, USER_AGENT};
pub use system_clock::SystemClock;
pub use user_cache::InMemoryUserCache;
