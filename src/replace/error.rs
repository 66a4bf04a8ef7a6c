use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid replacement scheme: {0}")]
    InvalidScheme(String),

    #[error(
        "fractional displacement {value:.3} on axis {axis} is outside (-2, 2); \
         input coordinates are malformed"
    )]
    GeometricPrecondition { axis: usize, value: f64 },
}

impl Error {
    pub fn invalid_scheme(reason: impl Into<String>) -> Self {
        Self::InvalidScheme(reason.into())
    }
}
