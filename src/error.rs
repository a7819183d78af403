#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("Invalid config value for \"{key}\": {msg}")]
    InvalidConfig { key: String, msg: String },

    #[error("Logging setup failed: {msg}")]
    LoggingSetup { msg: String },
}
