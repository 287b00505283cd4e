//! Retry loop with binary exponential backoff under an overall deadline

use tokio::time::Instant;

use crate::errors::{ReqoError, Result};
use crate::models::ComposedRequest;
use crate::network::client::{ReqwestTransport, Transport};
use crate::network::ExecOptions;

/// Sends `request` with the options' timeout, retries and redirect policy.
///
/// A final non-2xx response is returned as `Ok`; only transport failures,
/// redirect overflow and the deadline are errors.
pub async fn execute(request: &ComposedRequest, options: &ExecOptions) -> Result<reqwest::Response> {
    let transport = ReqwestTransport::new(options)?;
    execute_with(&transport, request, options).await
}

/// Like [`execute`] over any transport; the deadline starts now
pub async fn execute_with<T: Transport>(
    transport: &T,
    request: &ComposedRequest,
    options: &ExecOptions,
) -> Result<reqwest::Response> {
    execute_until(transport, request, options, Instant::now() + options.timeout).await
}

/// Runs the attempt loop until it settles or `deadline` passes, whichever
/// comes first. In-flight attempts and backoff sleeps are dropped at the
/// deadline.
pub async fn execute_until<T: Transport>(
    transport: &T,
    request: &ComposedRequest,
    options: &ExecOptions,
    deadline: Instant,
) -> Result<reqwest::Response> {
    let budget = deadline.saturating_duration_since(Instant::now());
    match tokio::time::timeout_at(deadline, attempt_loop(transport, request, options)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(url = %request.url, ?budget, "Deadline exceeded");
            Err(ReqoError::DeadlineExceeded(budget))
        }
    }
}

async fn attempt_loop<T: Transport>(
    transport: &T,
    request: &ComposedRequest,
    options: &ExecOptions,
) -> Result<reqwest::Response> {
    let mut backoff = options.backoff;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        tracing::info!(attempt, method = %request.method, url = %request.url, "Sending request");
        let result = transport.send(request).await;

        if is_settled(&result, request) || attempt > options.retries {
            match &result {
                Ok(resp) => tracing::info!(attempt, status = resp.status().as_u16(), "Request completed"),
                Err(e) => tracing::info!(attempt, error = %e, "Request failed"),
            }
            return result;
        }

        match &result {
            Ok(resp) => tracing::warn!(attempt, status = resp.status().as_u16(), ?backoff, "Server error, retrying"),
            Err(e) => tracing::warn!(attempt, error = %e, ?backoff, "Transport error, retrying"),
        }
        tokio::time::sleep(backoff).await;
        backoff = backoff.saturating_mul(2).min(options.max_backoff);
    }
}

/// An attempt settles unless it hit a transport failure, or a 5xx on an
/// idempotent method. A 5xx on POST/PUT/... is final since the side effect
/// may already have happened.
fn is_settled(result: &Result<reqwest::Response>, request: &ComposedRequest) -> bool {
    match result {
        Ok(resp) => resp.status().as_u16() < 500 || !request.method.is_idempotent(),
        Err(ReqoError::Transport { .. }) => false,
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HttpMethod, RequestSpec};
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::Mutex;
    use std::time::Duration;

    enum Step {
        Status(u16),
        Fail,
        Hang,
    }

    /// Plays back a scripted sequence of outcomes and records when each
    /// attempt started
    struct ScriptedTransport {
        steps: Mutex<VecDeque<Step>>,
        started: Mutex<Vec<Instant>>,
    }

    impl ScriptedTransport {
        fn new(steps: Vec<Step>) -> Self {
            ScriptedTransport {
                steps: Mutex::new(steps.into()),
                started: Mutex::new(Vec::new()),
            }
        }

        fn gaps(&self) -> Vec<Duration> {
            let started = self.started.lock().unwrap();
            started.windows(2).map(|w| w[1] - w[0]).collect()
        }

        fn attempts(&self) -> usize {
            self.started.lock().unwrap().len()
        }
    }

    impl Transport for ScriptedTransport {
        fn send(
            &self,
            request: &ComposedRequest,
        ) -> impl Future<Output = Result<reqwest::Response>> + Send {
            self.started.lock().unwrap().push(Instant::now());
            let step = self.steps.lock().unwrap().pop_front().unwrap_or(Step::Status(200));
            let url = request.url.to_string();
            async move {
                match step {
                    Step::Status(code) => {
                        let resp = http::Response::builder()
                            .status(code)
                            .body(code.to_string())
                            .unwrap();
                        Ok(reqwest::Response::from(resp))
                    }
                    Step::Fail => Err(ReqoError::Transport {
                        url,
                        message: "connection refused".into(),
                    }),
                    Step::Hang => {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                        unreachable!("attempt should have been cancelled")
                    }
                }
            }
        }
    }

    fn request(method: &str) -> ComposedRequest {
        let mut project = crate::models::Project::new("t");
        project.default_env = "dev".into();
        project.environments.insert(
            "dev".into(),
            crate::models::Environment::new("http://localhost"),
        );
        crate::compose::build(&project, &RequestSpec::new(method, "/x")).unwrap()
    }

    fn options(retries: u32, backoff_ms: u64) -> ExecOptions {
        ExecOptions {
            retries,
            backoff: Duration::from_millis(backoff_ms),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_retries_server_errors_with_doubling_backoff() {
        let transport =
            ScriptedTransport::new(vec![Step::Status(500), Step::Status(500), Step::Status(200)]);
        let resp = execute_with(&transport, &request("GET"), &options(2, 200))
            .await
            .unwrap();

        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(
            transport.gaps(),
            vec![Duration::from_millis(200), Duration::from_millis(400)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_post_is_not_retried_on_server_error() {
        let transport =
            ScriptedTransport::new(vec![Step::Status(500), Step::Status(500), Step::Status(200)]);
        let resp = execute_with(&transport, &request("POST"), &options(2, 200))
            .await
            .unwrap();

        assert_eq!(resp.status().as_u16(), 500);
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_post_is_retried_on_transport_failure() {
        let transport = ScriptedTransport::new(vec![Step::Fail, Step::Status(201)]);
        let req = request("POST");
        assert_eq!(req.method, HttpMethod::POST);

        let resp = execute_with(&transport, &req, &options(1, 50)).await.unwrap();
        assert_eq!(resp.status().as_u16(), 201);
        assert_eq!(transport.gaps(), vec![Duration::from_millis(50)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_failure_is_returned_after_retries() {
        let transport = ScriptedTransport::new(vec![Step::Fail, Step::Fail, Step::Fail]);
        let result = execute_with(&transport, &request("GET"), &options(2, 10)).await;
        assert!(matches!(result, Err(ReqoError::Transport { .. })));
        assert_eq!(transport.attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_server_error_is_not_an_executor_error() {
        let transport = ScriptedTransport::new(vec![Step::Status(503), Step::Status(503)]);
        let resp = execute_with(&transport, &request("GET"), &options(1, 10))
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 503);
        assert_eq!(transport.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_errors_are_accepted() {
        let transport = ScriptedTransport::new(vec![Step::Status(404)]);
        let resp = execute_with(&transport, &request("GET"), &options(3, 10))
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 404);
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_is_capped() {
        let transport = ScriptedTransport::new(vec![
            Step::Status(500),
            Step::Status(500),
            Step::Status(500),
            Step::Status(200),
        ]);
        let opts = ExecOptions {
            retries: 3,
            backoff: Duration::from_secs(1),
            max_backoff: Duration::from_millis(1500),
            timeout: Duration::from_secs(60),
            ..Default::default()
        };
        execute_with(&transport, &request("GET"), &opts).await.unwrap();
        assert_eq!(
            transport.gaps(),
            vec![
                Duration::from_secs(1),
                Duration::from_millis(1500),
                Duration::from_millis(1500)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_aborts_in_flight_attempt() {
        let transport = ScriptedTransport::new(vec![Step::Hang]);
        let opts = ExecOptions {
            timeout: Duration::from_secs(2),
            ..options(3, 10)
        };
        let result = execute_with(&transport, &request("GET"), &opts).await;
        assert!(matches!(result, Err(ReqoError::DeadlineExceeded(_))));
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_aborts_backoff_sleep() {
        let transport = ScriptedTransport::new(vec![
            Step::Status(500),
            Step::Status(500),
            Step::Status(500),
        ]);
        let opts = ExecOptions {
            timeout: Duration::from_secs(15),
            ..options(5, 10_000)
        };
        let result = execute_with(&transport, &request("GET"), &opts).await;
        assert!(matches!(result, Err(ReqoError::DeadlineExceeded(_))));
        // attempts at t=0 and t=10s; the 20s sleep that follows is cut short
        assert_eq!(transport.attempts(), 2);
    }
}
