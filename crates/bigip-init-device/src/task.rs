//! Asynchronous task polling against the management API

use crate::error::{DeviceError, Result};
use crate::management::ManagementClient;
use bigip_init_core::http::HttpResponse;
use bigip_init_core::retry::{ClosurePredicate, Retrier, RetryError, RetryPolicy};
use tracing::debug;

/// Poll a task path until its status stops changing.
///
/// Converged means 200, 422 or any 5xx. Whether a terminal response is
/// success or failure is the caller's judgment; this layer only decides
/// that the task stopped moving. Exhausting the poll budget is
/// "Max count exceeded".
pub async fn wait_for_task(
    mgmt: &ManagementClient,
    task_path: &str,
    policy: RetryPolicy,
) -> Result<HttpResponse> {
    debug!("Polling task at {}", task_path);

    let result = Retrier::named("task-wait", policy)
        .with_predicate(ClosurePredicate::new(DeviceError::is_transient))
        .execute(|| poll_once(mgmt, task_path))
        .await;

    match result {
        Ok(response) => Ok(response),
        Err(RetryError::NonRetryable(source)) => Err(source),
        Err(RetryError::Exhausted { .. }) => Err(DeviceError::MaxCountExceeded),
    }
}

async fn poll_once(mgmt: &ManagementClient, task_path: &str) -> Result<HttpResponse> {
    let response = mgmt.get(task_path).continue_on_error(true).send().await?;

    match response.code {
        200 | 422 => Ok(response),
        code if code >= 500 => Ok(response),
        code => Err(DeviceError::TaskPending {
            status: code.to_string(),
        }),
    }
}
