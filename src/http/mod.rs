//! HTTP/1.0 request handling.
//!
//! # Data Flow
//! ```text
//! client bytes
//!     → request.rs (request line: method, target, version)
//!     → uri.rs (target → hostname, port, path)
//!     → headers.rs (client headers → canonical outbound block)
//!     → [relay engine writes the block upstream]
//!
//! refused requests
//!     → response.rs (HTML error page)
//! ```

pub mod headers;
pub mod request;
pub mod response;
pub mod uri;

pub use headers::{ClientHeaders, HeaderRewriter, InjectedHeaders};
pub use request::RequestLine;
pub use response::{respond_error, ErrorStatus};
pub use uri::{parse_target, ParsedTarget};
