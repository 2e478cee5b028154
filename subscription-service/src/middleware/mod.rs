pub mod admin;
pub mod trace_context;

pub use admin::AdminUser;
pub use trace_context::http_span;
