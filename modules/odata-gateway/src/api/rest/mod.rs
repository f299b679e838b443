pub mod auth;
pub mod error;
pub mod handlers;
pub mod problem;
pub mod request_id;
pub mod routes;

pub use problem::Problem;

/// Result type of every handler.
pub type ApiResult<T> = Result<T, Problem>;
