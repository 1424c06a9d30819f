pub mod config;
pub mod error;
pub mod message;
pub mod payload;
pub mod providers;
pub mod types;

pub use config::*;
pub use error::*;
pub use message::Mandrill;
pub use payload::{MessageHeaders, MessagePayload, SendRequest};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Blocking-style POST of form-encoded parameters. One call per send, no
/// retries.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_form(
        &self,
        url: &Url,
        form: &[(String, String)],
    ) -> Result<HttpResponse, EmailError>;
    fn name(&self) -> &str;
}

pub type DynHttpTransport = Arc<dyn HttpTransport>;

pub fn create_transport(config: &MandrillConfig) -> Result<DynHttpTransport, EmailError> {
    match config.transport {
        TransportKind::Http => Ok(Arc::new(providers::http::ReqwestTransport::new(config)?)),
        TransportKind::Null => Ok(Arc::new(providers::null::NullTransport::new())),
    }
}
