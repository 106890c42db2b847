use thiserror::Error;

/// Rejections raised while turning CLI flags or API payloads into engine inputs.
#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("{flag} must be a finite amount >= 0, got {value}")]
    InvalidAmount { flag: &'static str, value: f64 },

    #[error("{flag} must be a finite percent > -100, got {value}")]
    InvalidRate { flag: &'static str, value: f64 },

    #[error("--purchase-tax-percent must be one of 0, 6, 8 or 10, got {value}")]
    UnsupportedPurchaseTax { value: f64 },

    #[error("--occupancy-percent must be between 0 and 100, got {value}")]
    OccupancyOutOfRange { value: f64 },

    #[error("--sale-year must be between 1 and {max}, got {value}")]
    SaleYearOutOfRange { value: u32, max: u32 },

    #[error("--horizon-years must be between 1 and {max}, got {value}")]
    HorizonOutOfRange { value: u32, max: u32 },

    #[error("--term-years must be <= {max}, got {value}")]
    TermTooLong { value: u32, max: u32 },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}
