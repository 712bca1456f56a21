//! Top-level error carried to `main`.
//!
//! Module seams use their own `thiserror` enums (`LoadError`, `RenderError`);
//! those collapse into an `AppError` with the process exit code:
//!
//! - `2`: input or configuration problem
//! - `3`: no usable data
//! - `4`: rendering/runtime failure

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<crate::io::LoadError> for AppError {
    fn from(err: crate::io::LoadError) -> Self {
        AppError::new(2, err.to_string())
    }
}

impl From<crate::render::RenderError> for AppError {
    fn from(err: crate::render::RenderError) -> Self {
        AppError::new(4, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::io::LoadError;

    #[test]
    fn load_errors_map_to_input_exit_code() {
        let err: AppError = LoadError::NotAnArray {
            path: PathBuf::from("snap.json"),
        }
        .into();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("snap.json"));
    }
}
