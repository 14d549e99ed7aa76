//! Middleware for invoice-service.

mod actor;

pub use actor::{ActorContext, ACTOR_ID_HEADER};
