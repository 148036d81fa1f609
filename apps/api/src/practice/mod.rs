//! Question bank and in-progress drafts.

pub mod handlers;
