#![allow(dead_code)]

// Common test utilities shared by the integration suites
// Spins up wiremock servers and builds clients pointed at them

pub mod builders;

use smartsheet_client::{ClientConfig, SmartsheetClient};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use wiremock::MockServer;

/// Build a client against a mock server with the given retry ceiling
pub fn client_for(server: &MockServer, max_retry_timeout: Duration) -> SmartsheetClient {
    let config = ClientConfig::new("test-token")
        .with_base_uri(server.uri())
        .with_max_retry_timeout(max_retry_timeout);

    SmartsheetClient::new(config).expect("client must build")
}

/// Shared request counter for closures passed to `respond_with`
#[derive(Clone, Default)]
pub struct CallCounter(Arc<AtomicU32>);

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment and return the zero-based index of this call
    pub fn hit(&self) -> u32 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }

    pub fn count(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}
