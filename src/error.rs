use thiserror::Error;

/// Failures crossing the service boundary. `NotFound` and `Forbidden`
/// carry domain meaning; everything an adapter can throw is folded into
/// `Internal` so callers never see backend detail.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("link not found")]
    NotFound,
    #[error("requester does not own this link")]
    Forbidden,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
