//! Request handlers, one module per resource

pub mod repositories;
pub mod users;
