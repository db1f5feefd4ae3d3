//! Error types.
//!
//! - `SimError` is what the simulation core returns: a configuration defect caught
//!   before day-stepping begins, or an invariant violation caught mid-run.
//! - `AppError` is the binary-facing error (message + process exit code).

/// Errors raised by the simulation core.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    /// Invalid or degenerate inputs (bad steepness, degenerate distribution shape,
    /// empty date range, probability mass not summing to 1).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An invariant broke during the run.
    #[error("numeric instability on day {day}: {quantity} = {value}")]
    NumericInstability {
        day: usize,
        quantity: &'static str,
        value: f64,
    },
}

impl SimError {
    pub fn config(message: impl Into<String>) -> Self {
        SimError::Configuration(message.into())
    }
}

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

impl From<SimError> for AppError {
    fn from(err: SimError) -> Self {
        let exit_code = match err {
            SimError::Configuration(_) => 2,
            SimError::NumericInstability { .. } => 4,
        };
        AppError::new(exit_code, err.to_string())
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
    fn sim_errors_map_to_exit_codes() {
        let config: AppError = SimError::config("bad steepness").into();
        assert_eq!(config.exit_code(), 2);
        assert!(config.to_string().contains("bad steepness"));

        let unstable: AppError = SimError::NumericInstability {
            day: 12,
            quantity: "susceptible_remaining",
            value: -3.5,
        }
        .into();
        assert_eq!(unstable.exit_code(), 4);
        assert_eq!(
            unstable.to_string(),
            "numeric instability on day 12: susceptible_remaining = -3.5"
        );
    }
}
