//! Async client for the Graph Marketing API.
//!
//! [`GraphApi`] owns the session (token, optional appsecret proof,
//! transport) and sends every call. Nodes are [`GraphObject`]s with a
//! static [`ObjectSpec`]; [`CrudNode`] adds reads, updates, deletes and edge
//! traversal on top, and the typed wrappers in [`nodes`] add the
//! endpoint-specific param checks. Edge reads page through a [`Cursor`];
//! up to fifty calls can share one round-trip through a [`Batch`].

pub mod api;
pub mod batch;
pub mod config;
pub mod crud;
pub mod cursor;
pub mod errors;
pub mod nodes;
pub mod object;
pub mod params;
pub mod parser;
pub mod request;
pub mod response;
pub mod session;
pub mod telemetry;
pub mod type_checker;
pub mod video_upload;

pub use api::{ApiPath, CallOptions, Files, GraphApi};
pub use batch::{Batch, BatchCallback, BatchItem};
pub use config::{DEFAULT_API_VERSION, GraphConfig, SDK_VERSION};
pub use crud::{CallOutcome, CrudNode, RequestMode};
pub use cursor::Cursor;
pub use errors::{ConfigError, GraphApiError, GraphApiResult, RequestError};
pub use object::{FieldValue, GraphObject, ObjectSpec};
pub use params::Params;
pub use parser::ObjectParser;
pub use request::{ApiType, GraphRequest, RequestOutcome};
pub use response::GraphResponse;
pub use session::Session;
pub use type_checker::ParamChecker;
pub use video_upload::{DEFAULT_VIDEO_BASE_URL, VideoUploader};

pub use http_transport::HttpMethod;
