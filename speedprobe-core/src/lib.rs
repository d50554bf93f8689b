#![forbid(unsafe_code)]

mod config;
mod http;
mod mock;
mod probe;

pub use config::{DEFAULT_UPLOAD_SIZE_KB, ProbeConfig, SAMPLE_LADDER_KB};
pub use http::{Error, HttpClient, HttpRequest, HttpResponse, HttpTransportErrorKind, Result};
pub use mock::{MockOutcome, MockProbe};
pub use probe::{ProbeOutcome, ProgressFn, SpeedProbe};
