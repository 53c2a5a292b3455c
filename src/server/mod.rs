mod assets;
pub mod http;
pub mod sessions;

pub use http::Server;
