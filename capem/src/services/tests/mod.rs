//! Service-specific tests
//!
//! Each service has its own test file. Nothing here needs docker, mysql or
//! root: the tests cover command rendering and the parts that run locally.

mod docker;
mod hosts;

pub mod common {
    use std::time::Duration;
    use tokio::time::timeout;

    /// Standard timeout for async operations in tests
    pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    /// Run an async operation with the standard timeout
    pub async fn with_timeout<T, F>(future: F) -> Result<T, tokio::time::error::Elapsed>
    where
        F: std::future::Future<Output = T>,
    {
        timeout(TEST_TIMEOUT, future).await
    }
}
