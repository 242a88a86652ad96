use thiserror::Error;

/// Errors shared by the client, report, file and web layers
///
/// Only the first three variants are user-facing. The rest are internal
/// failures that get logged and degrade to a generic notice.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad credentials or any failure while listing contests.
    /// The platform's signaling is too coarse to tell the two apart.
    #[error("invalid credentials or contest listing failed")]
    Auth,

    /// The submitted slug is not among the freshly listed contests
    #[error("contest `{0}` not found")]
    ContestNotFound(String),

    /// Download requested for a missing or already removed file
    #[error("file `{0}` not found")]
    FileNotFound(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("xlsx error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[cfg(feature = "web")]
    #[error("template error: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Text shown to the user in a flash notice
    pub fn notice(&self) -> &'static str {
        match self {
            AppError::Auth => "Invalid email or password. Please try again.",
            AppError::ContestNotFound(_) => "Contest not found.",
            AppError::FileNotFound(_) => "File not found.",
            _ => "Something went wrong while preparing the export. Please try again.",
        }
    }

    /// Whether the error is an expected outcome of user input rather than a fault
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            AppError::Auth | AppError::ContestNotFound(_) | AppError::FileNotFound(_)
        )
    }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_match_user_facing_errors() {
        assert_eq!(
            AppError::Auth.notice(),
            "Invalid email or password. Please try again."
        );
        assert_eq!(
            AppError::FileNotFound("x.xlsx".into()).notice(),
            "File not found."
        );
        assert!(AppError::ContestNotFound("abc".into()).is_user_facing());

        let io = AppError::from(std::io::Error::other("disk full"));
        assert!(!io.is_user_facing());
        assert!(io.to_string().contains("disk full"));
    }
}
