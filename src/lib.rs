pub mod config;
pub mod error;
pub mod sweep;
pub mod telemetry;
pub mod workflows;

mod cli;

pub use error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
