//! Rust SDK for the SharpAPI custom workflows API.
//!
//! Discover hosted workflows, fetch their parameter schemas, validate a
//! payload client-side against the same rules the server applies, and
//! submit it for asynchronous execution — as a JSON body or a multipart
//! form with file attachments, selected by the workflow's input mode.
#![cfg_attr(docsrs, feature(doc_cfg))]
// Allow large error types - refactoring to Box<Error> would be a breaking change
#![allow(clippy::result_large_err)]

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://sharpapi.com/api/v1";

/// Default User-Agent header value.
pub(crate) const DEFAULT_USER_AGENT: &str =
    concat!("SharpAPIRustCustomWorkflow/", env!("CARGO_PKG_VERSION"));

/// Default connection timeout (5 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Default request timeout (60 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);

/// Maximum page size the list endpoint accepts.
pub const MAX_PER_PAGE: u32 = 100;

mod cache;
#[cfg(feature = "client")]
mod client;
mod encode;
mod errors;
mod files;
#[cfg(feature = "client")]
mod http;
#[cfg(feature = "mock")]
mod mock;
mod types;
mod validate;

pub use cache::DescribeCache;
pub use encode::{encode, EncodedRequest, Part};
pub use errors::{
    APIError, Error, FieldErrors, Result, RetryMetadata, ValidationReport,
};
#[cfg(feature = "client")]
pub use errors::{TransportError, TransportErrorKind};
pub use files::{FileField, FileSet};
pub use types::{
    InputMode, ParamType, Params, WorkflowDefinition, WorkflowListResult, WorkflowParam,
};
pub use validate::{check_json_value, validate};

#[cfg(feature = "client")]
pub use client::{Client, Config, WorkflowsClient};
#[cfg(feature = "client")]
pub use http::RetryConfig;

#[cfg(feature = "mock")]
pub use mock::{fixtures, ExecuteCall, MockConfig, MockWorkflowsClient};
