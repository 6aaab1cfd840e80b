//! Error types shared by the viewer.

use std::path::PathBuf;

/// Errors raised while starting the viewer or loading its assets.
#[derive(thiserror::Error, Debug)]
pub enum ViewerError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no compatible graphics adapter found")]
    NoAdapter,

    #[error("failed to request device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface does not support any texture format")]
    NoSurfaceFormat,

    #[error("out of memory while acquiring the next frame")]
    SurfaceOutOfMemory,

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("{}:{line}: {message}", path.display())]
    Obj {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("state file: {0}")]
    StateFile(String),

    #[error(transparent)]
    Shader(#[from] ShaderError),
}

impl ViewerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ViewerError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn obj(path: impl Into<PathBuf>, line: usize, message: impl ToString) -> Self {
        ViewerError::Obj {
            path: path.into(),
            line,
            message: message.to_string(),
        }
    }
}

/// A uniform declared by the host is missing or mistyped in a shader.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    #[error("shader `{shader}`: no uniform binding named `{binding}`")]
    MissingBinding { shader: &'static str, binding: String },

    #[error("shader `{shader}`: struct `{name}` is not declared")]
    MissingStruct { shader: &'static str, name: String },

    #[error("shader `{shader}`: `{path}` is not declared")]
    MissingField { shader: &'static str, path: &'static str },

    #[error("shader `{shader}`: `{path}` has type `{found}`, expected `{expected}`")]
    TypeMismatch {
        shader: &'static str,
        path: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("shader `{shader}`: `{path}` is declared before `{previous}`")]
    OutOfOrder {
        shader: &'static str,
        path: &'static str,
        previous: &'static str,
    },
}

pub type ViewerResult<T> = Result<T, ViewerError>;
