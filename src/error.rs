use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] crate::api::ApiError),

    #[error(transparent)]
    Config(#[from] crate::terraform::ConfigError),

    #[error("invalid rules group: {0}")]
    Validation(#[from] crate::rules_group::ValidationError),

    #[error(transparent)]
    Engine(#[from] crate::engine::EngineError),

    #[error(transparent)]
    Workflow(#[from] crate::workflow::WorkflowError),

    #[error(transparent)]
    Store(#[from] crate::store::StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_error_from_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
        assert!(app_err.to_string().contains("file not found"));
    }

    #[test]
    fn test_api_error_is_transparent() {
        let api_err = crate::api::ApiError::NotFound {
            id: "abc".to_string(),
        };
        let app_err: AppError = api_err.into();
        assert!(matches!(app_err, AppError::Api(_)));
        assert_eq!(app_err.to_string(), "rules group not found: 'abc'");
    }

    #[test]
    fn test_validation_error_is_prefixed() {
        let err: AppError = crate::rules_group::ValidationError::Empty {
            path: "name".to_string(),
        }
        .into();
        assert!(err.to_string().starts_with("invalid rules group: "));
    }
}
