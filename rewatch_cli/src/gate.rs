use async_trait::async_trait;
use owo_colors::OwoColorize;
use rewatch_core::{ConfirmationGate, HistoryError};

/// Interactive two-factor gate: asks the user to approve the sign-in and
/// waits for Enter. The read happens on a blocking thread so the runtime
/// keeps ticking while we wait.
pub struct StdinGate;

#[async_trait]
impl ConfirmationGate for StdinGate {
    async fn wait_for_confirmation(&self) -> Result<(), HistoryError> {
        println!();
        println!(
            "{} approve the sign-in on your device, then press Enter to continue...",
            "Two-factor authentication required:".yellow().bold()
        );

        let read = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| ())
        })
        .await
        .map_err(|e| HistoryError::Other(format!("gate task failed: {e}")))?;
        read?;
        Ok(())
    }
}
