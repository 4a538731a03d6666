//! Durable and session-scoped storage adapters.

mod file_cookie_store;
mod jar;
mod memory;

pub use file_cookie_store::FileCookieStore;
pub use jar::{CookieJar, StoredCookie};
pub use memory::{MemoryCookieStore, MemorySessionStorage};
