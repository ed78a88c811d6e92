//! Application error type.
//!
//! Every fallible operation surfaces a single `AppError` that carries the
//! process exit code alongside a user-facing message:
//!
//! - `2`: usage, configuration, or input-file problems
//! - `3`: no usable data after cleaning
//! - `4`: runtime failures (output I/O, terminal, numerics)

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

    pub fn message(&self) -> &str {
        &self.message
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_message() {
        let err = AppError::new(2, "No CSV files found in 'data'.");
        assert_eq!(err.to_string(), "No CSV files found in 'data'.");
        assert_eq!(err.exit_code(), 2);
    }
}
