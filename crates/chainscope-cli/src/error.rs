use chainscope_core::RouteError;
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] chainscope_core::ValidationError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Core(#[from] chainscope_core::CoreError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Route(RouteError::Invalid(_)) => 2,
            Self::Route(RouteError::NotConfigured { .. }) => 4,
            Self::Route(_) => 3,
            Self::Core(_) | Self::Serialization(_) | Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use chainscope_core::ValidationError;

    use super::*;

    #[test]
    fn maps_route_errors_to_exit_codes() {
        assert_eq!(
            CliError::from(RouteError::not_configured("set ETHERSCAN_API_KEY")).exit_code(),
            4
        );
        assert_eq!(CliError::from(RouteError::NoProviders).exit_code(), 3);
        assert_eq!(
            CliError::from(RouteError::from(ValidationError::EmptyChain)).exit_code(),
            2
        );
        assert_eq!(CliError::from(ValidationError::EmptyTokenQuery).exit_code(), 2);
    }
}
