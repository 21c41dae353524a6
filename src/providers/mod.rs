pub mod http;
pub mod vanguard;

pub use http::HttpFetcher;
pub use vanguard::Endpoints;
