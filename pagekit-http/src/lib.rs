//! Cancellable HTTP requests over [reqwest](https://docs.rs/reqwest).
//!
//! An [`HttpRequest`] is sent once with a set of [`RequestOptions`] and can be
//! aborted through any of its clones. Requests can be registered in
//! [`ActiveRequests`] under a key so that unrelated code can cancel them.
//!
//! ```no_run
//! use pagekit_http::{HttpRequest, RequestOptions};
//!
//! # async fn example() -> Result<(), pagekit_http::RequestError> {
//! let request = HttpRequest::new(reqwest::Client::new());
//! let Some(response) = request.send(RequestOptions::get("https://example.com/api/items/")) else {
//!     return Ok(());
//! };
//! let payload = response.await?.into_payload();
//! # let _ = payload;
//! # Ok(())
//! # }
//! ```

pub mod body;
mod error;
pub mod form;
mod options;
mod registry;
mod request;
pub mod response;

pub use body::Body;
pub use error::{ABORTED_MESSAGE, RequestError, RequestErrorKind};
pub use form::{FilePart, FormData, FormField, FormValue};
pub use options::{RequestOptions, ResponseType};
pub use registry::{ActiveRequests, Registration};
pub use request::{HttpRequest, PROGRESS_EVENT, Progress, RequestState};
pub use response::Response;
