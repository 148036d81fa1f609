pub mod handlers;
pub mod invite;
