pub mod http;
pub mod null;
