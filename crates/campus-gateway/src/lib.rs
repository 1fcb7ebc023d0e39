//! Typed request gateway for the Campus API.
//!
//! Everything that talks to the backend goes through [`RequestGateway`]:
//! the session engine for login/refresh and every data module for domain
//! data. It does three things:
//!
//! 1. **Builds requests**: base URL + endpoint + query parameters
//!    (absent values skipped), JSON or multipart bodies.
//! 2. **Classifies responses** into a payload or an [`ApiError`] with the
//!    taxonomy from [`ErrorKind`].
//! 3. **Offers helpers** for paginated listing, search and bulk calls.
//!
//! Retrying is the caller's business; see [`RetryPolicy`].
//!
//! # Feature Flags
//!
//! - `http` (default): [`ReqwestTransport`], a `reqwest`-backed [`Transport`]

#![allow(async_fn_in_trait)]

mod error;
mod gateway;
mod page;
mod params;
#[cfg(feature = "http")]
mod reqwest_transport;
mod retry;
mod transport;

pub use error::{ApiError, DECODE_ERROR, ENCODE_ERROR, ErrorKind, TransportError};
pub use gateway::{
    Body, DEFAULT_BASE_URL, GatewayConfig, Reply, RequestGateway, RequestOptions,
};
pub use page::{Envelope, Page, PageQuery, SortOrder};
pub use params::QueryParams;
#[cfg(feature = "http")]
pub use reqwest_transport::ReqwestTransport;
pub use retry::RetryPolicy;
pub use transport::{HttpRequest, HttpResponse, Method, Part, RequestBody, Transport};
