//! Sleep-and-recheck polling of protocol operations.

use std::time::Duration;

use tokio::time::Instant;
use vlei_core::ProtocolConfig;

use crate::error::ProtocolError;
use crate::protocol::{Operation, ProtocolClient};

/// Poll `operation` every `interval` until it reports done or `timeout`
/// elapses. The returned operation may still carry an error.
pub async fn wait_for_operation(
    client: &dyn ProtocolClient,
    operation: Operation,
    timeout: Duration,
    interval: Duration,
) -> Result<Operation, ProtocolError> {
    let deadline = Instant::now() + timeout;
    let mut current = operation;

    loop {
        if current.done {
            return Ok(current);
        }
        if Instant::now() >= deadline {
            return Err(ProtocolError::OperationTimeout {
                name: current.name,
                timeout_ms: timeout.as_millis() as u64,
            });
        }
        tokio::time::sleep(interval).await;
        current = client.get_operation(&current.name).await?;
    }
}

/// Wait for `operation` under the configured budget, fail if it finished
/// with an error, then delete it.
pub async fn complete_operation(
    client: &dyn ProtocolClient,
    operation: Operation,
    config: &ProtocolConfig,
) -> Result<Operation, ProtocolError> {
    let done = wait_for_operation(
        client,
        operation,
        config.operation_timeout(),
        config.poll_interval(),
    )
    .await?;

    if let Some(reason) = done.error_message() {
        return Err(ProtocolError::OperationFailed {
            name: done.name,
            reason,
        });
    }

    discard_operation(client, &done.name).await;
    Ok(done)
}

/// Delete a finished operation. Failure only leaves garbage behind.
pub async fn discard_operation(client: &dyn ProtocolClient, name: &str) {
    if let Err(e) = client.delete_operation(name).await {
        tracing::warn!(operation = name, error = %e, "failed to delete operation");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::{LocalNetwork, NetworkOptions};
    use crate::protocol::SessionConnector;
    use vlei_core::WitnessPolicy;

    const PASSCODE: &str = "0123456789abcdefghijk";

    #[tokio::test]
    async fn test_wait_for_lagging_operation() {
        let network = LocalNetwork::with_options(NetworkOptions {
            operation_lag: 3,
            ..Default::default()
        });
        let client = network.connect(PASSCODE).await.unwrap();
        let op = client
            .create_identifier("gleif", &WitnessPolicy::default())
            .await
            .unwrap();
        assert!(!op.done);

        let done = wait_for_operation(
            client.as_ref(),
            op,
            Duration::from_millis(500),
            Duration::from_millis(1),
        )
        .await
        .unwrap();
        assert!(done.done);
        assert!(done.response_prefix().is_some());
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let network = LocalNetwork::with_options(NetworkOptions {
            operation_lag: 10_000,
            ..Default::default()
        });
        let client = network.connect(PASSCODE).await.unwrap();
        let op = client
            .create_identifier("gleif", &WitnessPolicy::default())
            .await
            .unwrap();

        let result = wait_for_operation(
            client.as_ref(),
            op,
            Duration::from_millis(20),
            Duration::from_millis(2),
        )
        .await;
        assert!(matches!(
            result,
            Err(ProtocolError::OperationTimeout { timeout_ms: 20, .. })
        ));
    }

    #[tokio::test]
    async fn test_complete_operation_deletes() {
        let network = LocalNetwork::new();
        let client = network.connect(PASSCODE).await.unwrap();
        let op = client
            .create_identifier("gleif", &WitnessPolicy::default())
            .await
            .unwrap();
        let name = op.name.clone();

        complete_operation(client.as_ref(), op, &ProtocolConfig::fast())
            .await
            .unwrap();
        assert!(matches!(
            client.get_operation(&name).await,
            Err(ProtocolError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_complete_operation_surfaces_error() {
        let network = LocalNetwork::new();
        let client = network.connect(PASSCODE).await.unwrap();
        let op = client
            .resolve_introduction("http://127.0.0.1:3902/oobi/Eunknown/agent/Eagent", "ghost")
            .await
            .unwrap();

        let result = complete_operation(client.as_ref(), op, &ProtocolConfig::fast()).await;
        assert!(matches!(result, Err(ProtocolError::OperationFailed { .. })));
    }
}
