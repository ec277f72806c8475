pub mod backend;
pub mod client;
pub mod error;
pub mod request;
pub mod response;
pub mod utils;

pub use backend::{HttpBackend, ReqwestBackend, TlsSettings, TransportSettings, DEFAULT_TIMEOUT};
pub use client::{Backoff, Client, DEFAULT_MAX_RETRY};
pub use error::{HttpError, RequestError};
pub use request::{HttpRequest, RequestBuilder};
pub use response::HttpResponse;
pub use utils::{parse_method, SUPPORTED_METHODS};
