pub mod dispatcher;
pub mod error;
pub mod metadata;
pub mod model;
pub mod ports;
pub mod service;
