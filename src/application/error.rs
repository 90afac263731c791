use thiserror::Error;

use crate::{
    application::{pagination::PaginationError, repos::RepoError},
    config::LoadError,
    domain::error::DomainError,
    infra::error::InfraError,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error("resource not found")]
    NotFound,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::NotFound => 2,
            AppError::Domain(DomainError::Validation { .. })
            | AppError::Validation(_)
            | AppError::Repo(RepoError::Pagination(_))
            | AppError::Config(_)
            | AppError::Infra(InfraError::Configuration { .. }) => 64,
            AppError::Infra(InfraError::Database { .. }) | AppError::Repo(_) => 69,
            AppError::Infra(_) | AppError::Unexpected(_) => 1,
        }
    }
}

impl From<PaginationError> for AppError {
    fn from(error: PaginationError) -> Self {
        Self::Repo(RepoError::Pagination(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheError;

    #[test]
    fn exit_codes_separate_usage_from_dependency_failures() {
        assert_eq!(AppError::NotFound.exit_code(), 2);
        assert_eq!(AppError::from(PaginationError::InvalidPage(0)).exit_code(), 64);
        assert_eq!(AppError::validation("bad").exit_code(), 64);
        let missing_url = InfraError::configuration("database url is not configured");
        assert_eq!(AppError::from(missing_url).exit_code(), 64);
        assert_eq!(AppError::from(InfraError::telemetry("no subscriber")).exit_code(), 1);
        assert_eq!(
            AppError::from(RepoError::from(CacheError::unavailable("down"))).exit_code(),
            69
        );
        assert_eq!(AppError::unexpected("boom").exit_code(), 1);
    }
}
