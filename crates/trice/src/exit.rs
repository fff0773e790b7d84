use std::fmt;
use std::io;

use trice_frame::FrameError;
use trice_route::RouteError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    if err.is_corruption() {
        return CliError::new(DATA_INVALID, format!("{context}: {err}"));
    }
    match err {
        FrameError::PayloadTooLarge { .. } | FrameError::IdOutOfRange(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::MissingCodec(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn route_error(context: &str, err: RouteError) -> CliError {
    match err {
        RouteError::Frame(err) => frame_error(context, err),
        RouteError::Io(err) => io_error(context, err),
        RouteError::Json(_)
        | RouteError::InvalidConfig(_)
        | RouteError::InvalidFilter { .. }
        | RouteError::DuplicateChannel(_) => CliError::new(USAGE, format!("{context}: {err}")),
        RouteError::UnknownChannel(_) => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}
