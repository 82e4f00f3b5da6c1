pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod oauth;
pub mod rejection;
pub mod response;
