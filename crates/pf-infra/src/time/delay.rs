use std::time::Duration;

use async_trait::async_trait;
use pf_core::ports::DelayPort;

pub struct TokioDelay;

#[async_trait]
impl DelayPort for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
