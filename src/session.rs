//! USSD session persistence
//!
//! State shapes, the discriminator codec and the expiring stores behind
//! [`SessionStore`].

pub mod codec;
mod state;
mod store;

#[cfg(feature = "redis")]
mod redis_store;

#[cfg(feature = "redis")]
pub use redis_store::RedisSessionStore;
pub use state::*;
pub use store::*;
