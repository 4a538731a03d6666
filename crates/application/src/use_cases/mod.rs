//! Application use cases (business logic orchestration).

mod onboarding;

pub use onboarding::*;
