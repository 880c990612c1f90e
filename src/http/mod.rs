//! HTTP/0.9 and HTTP/1.0 protocol handling.
//!
//! # Architecture
//!
//! - **`connection`**: Drives one client connection through its states
//! - **`parser`**: Byte-at-a-time line reader, request line and header parsing
//! - **`request`**: Parsed request representation
//! - **`response`**: Status codes and response metadata
//! - **`writer`**: Serializes response heads and error pages
//! - **`mime`**: Extension to MIME type table
//! - **`date`**: The three HTTP date grammars
//!
//! # Connection State Machine
//!
//! Each connection carries exactly one request:
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Request line, then headers up to the empty line
//!        └──────┬──────┘
//!               ├─ Malformed → Rejecting (4xx/5xx error page)
//!               │ Request parsed
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Resolve path, write head, stream body
//!        └──────┬───────────┘
//!               ▼
//!        ┌──────────────────┐
//!        │     Closed       │
//!        └──────────────────┘
//! ```
//!
//! Lines must end in CRLF. A lone CR or LF is a protocol error, not a line
//! break.

pub mod connection;
pub mod date;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
