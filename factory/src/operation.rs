use std::time::Duration;

use crate::error::Error;
use crate::http::resource_manager::ResourceManagerClient;
use crate::model::Operation;

/// Polls a long-running operation at a fixed interval until it reports
/// `done`, bounded by a maximum attempt count so a wedged operation
/// surfaces a timeout instead of blocking forever.
#[derive(Clone, Debug)]
pub struct OperationPoller {
    pub interval: Duration,
    pub max_attempts: usize,
}

impl Default for OperationPoller {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_attempts: 100,
        }
    }
}

impl OperationPoller {
    pub async fn wait(&self, client: &ResourceManagerClient, name: &str) -> Result<Operation, Error> {
        for attempt in 0..self.max_attempts {
            let operation = client.get_operation(name).await?;
            if operation.done {
                if let Some(status) = operation.error {
                    return Err(Error::OperationFailed {
                        name: name.to_string(),
                        message: status.message.unwrap_or_default(),
                    });
                }
                return Ok(operation);
            }
            tracing::debug!(name, attempt, "operation still running");
            tokio::time::sleep(self.interval).await;
        }
        Err(Error::OperationTimeout {
            name: name.to_string(),
            attempts: self.max_attempts,
        })
    }
}
