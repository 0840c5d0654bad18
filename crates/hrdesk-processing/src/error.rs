use hrdesk_core::AppError;
use thiserror::Error;

/// Failure of a single report generation run
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Unsupported report type: {0}")]
    UnsupportedType(String),

    #[error("Failed to load report data: {0}")]
    Data(#[from] AppError),

    #[error("Failed to render report: {0}")]
    Render(String),

    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to store report: {0}")]
    Storage(String),
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::UnsupportedType(kind) => AppError::UnsupportedReportType(kind),
            ReportError::Data(inner) => inner,
            ReportError::Render(message) => AppError::Rendering(message),
            ReportError::Io(e) => AppError::Rendering(e.to_string()),
            ReportError::Storage(message) => AppError::Storage(message),
        }
    }
}
