//! # Network Inspector Core

//! Request/response reconstruction for a mobile network inspector.
//! Instrumented clients stream request and response events; this crate
//! rebuilds them into a request table, decodes bodies and manages mock routes.
//!
//! ## Features
//!
//! - Reassembly of responses split into chunks
//! - Body decoding (base64, gzip, zlib, brotli, text detection)
//! - Request table with custom header columns
//! - Mock routes pushed back to the client
//! - Session export, cURL and text renderings
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              Instrumented client (device)                │
//! ├─────────────────────────────────────────────────────────┤
//! │        messages in  ▼            ▲  mockResponses        │
//! ├─────────────────────────────────────────────────────────┤
//! │                 NetworkPlugin (api)                      │
//! │  ┌──────────┐  ┌──────────┐  ┌─────────┐  ┌──────────┐  │
//! │  │  Chunk   │──│   Body   │──│ Request │  │   Mock   │  │
//! │  │ Reassem. │  │ Decoder  │  │  Table  │  │  Routes  │  │
//! │  └──────────┘  └──────────┘  └─────────┘  └──────────┘  │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod decode;
pub mod export;
pub mod mocking;
pub mod models;
pub mod protobuf;
pub mod state;
pub mod storage;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
