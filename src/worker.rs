use crate::error::WorkerError;
use crate::model::{Config, WorkerState};
use chrono::Utc;
use indicatif::ProgressBar;
use reqwest::Url;
use tracing::debug;

/// Resolves `/` against the configured base address.
fn target(uri: &str) -> Result<Url, WorkerError> {
    let invalid = |reason: String| WorkerError::InvalidUri {
        uri: uri.to_string(),
        reason,
    };
    let base = Url::parse(uri).map_err(|e| invalid(e.to_string()))?;
    if base.cannot_be_a_base() {
        return Err(invalid("not a base address".to_string()));
    }
    base.join("/").map_err(|e| invalid(e.to_string()))
}

/// Sends `GET /` back to back until the time budget runs out.
///
/// The budget is checked before every request and never interrupts one in
/// flight, so a slow response can push the worker past `config.minutes`. The
/// first failed request ends the loop.
pub async fn worker(
    rank: usize,
    config: Config,
    pb: ProgressBar,
) -> Result<WorkerState, WorkerError> {
    let begin = Utc::now();
    debug!(rank, "worker started");
    let result = run(&config, &pb, begin).await;

    match &result {
        Ok(_) => pb.finish_with_message("finished"),
        Err(e) => {
            pb.abandon_with_message(console::style(format!("failed: {e}")).red().to_string())
        }
    }

    result.map(|requests| WorkerState {
        rank,
        requests,
        begin,
        end: Utc::now(),
    })
}

async fn run(
    config: &Config,
    pb: &ProgressBar,
    begin: chrono::DateTime<Utc>,
) -> Result<usize, WorkerError> {
    let url = target(&config.uri)?;
    let client = reqwest::Client::builder()
        .build()
        .map_err(WorkerError::Client)?;
    let budget = config.run_for();
    let pace = config.pace();

    let mut requests = 0;
    while Utc::now() - begin < budget {
        if let Some(pause) = pace {
            tokio::time::sleep(pause).await;
        }

        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(WorkerError::Request)?;
        let status = response.status();
        requests += 1;
        if !status.is_success() {
            return Err(WorkerError::Status { status });
        }
        // read to the end so the connection goes back to the pool
        response.bytes().await.map_err(WorkerError::Request)?;

        pb.set_message(format!("{requests} requests, last {status}"));
        pb.tick();
    }
    Ok(requests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, Request, Respond, ResponseTemplate,
    };

    fn config(uri: String, seconds: f64, sleepms: u64) -> Config {
        Config {
            uri,
            threads: 1,
            minutes: seconds / 60.0,
            sleepms,
            poolsize: 0,
        }
    }

    async fn respond_with(server: &MockServer, response: impl Respond + 'static) {
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(response)
            .mount(server)
            .await;
    }

    /// Records when each request arrived.
    #[derive(Clone, Default)]
    struct Arrivals(Arc<Mutex<Vec<Instant>>>);

    impl Respond for Arrivals {
        fn respond(&self, _: &Request) -> ResponseTemplate {
            self.0.lock().unwrap().push(Instant::now());
            ResponseTemplate::new(200)
        }
    }

    #[test]
    fn target_is_root_of_base() {
        assert_eq!(
            target("http://example.test/api/v1").unwrap().as_str(),
            "http://example.test/"
        );
        assert_eq!(
            target("http://example.test").unwrap().as_str(),
            "http://example.test/"
        );
    }

    #[test]
    fn target_rejects_bad_uris() {
        assert!(matches!(target(""), Err(WorkerError::InvalidUri { .. })));
        assert!(matches!(
            target("not a uri"),
            Err(WorkerError::InvalidUri { .. })
        ));
        assert!(matches!(
            target("mailto:someone@example.test"),
            Err(WorkerError::InvalidUri { .. })
        ));
    }

    #[tokio::test]
    async fn zero_minutes_sends_nothing() {
        let server = MockServer::start().await;
        respond_with(&server, ResponseTemplate::new(200)).await;

        let state = worker(0, config(server.uri(), 0.0, 0), ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(state.requests, 0);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn keeps_sending_until_budget_is_spent() {
        let server = MockServer::start().await;
        respond_with(&server, ResponseTemplate::new(204)).await;

        let started = Instant::now();
        let state = worker(3, config(server.uri(), 0.5, 0), ProgressBar::hidden())
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert_eq!(state.rank, 3);
        assert!(state.requests > 1);
        assert!(elapsed >= Duration::from_millis(500));
        assert!(elapsed < Duration::from_secs(5));

        let received = server.received_requests().await.unwrap();
        assert_eq!(received.len(), state.requests);
        assert!(received.iter().all(|r| r.method.as_str() == "GET"));
        assert!(received.iter().all(|r| r.url.path() == "/"));
    }

    #[tokio::test]
    async fn paced_requests_are_spaced_apart() {
        let server = MockServer::start().await;
        let arrivals = Arrivals::default();
        respond_with(&server, arrivals.clone()).await;

        let state = worker(0, config(server.uri(), 1.0, 200), ProgressBar::hidden())
            .await
            .unwrap();

        let arrivals = arrivals.0.lock().unwrap();
        assert_eq!(arrivals.len(), state.requests);
        assert!(arrivals.len() >= 2);
        assert!(arrivals.len() <= 5);
        for pair in arrivals.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(200));
        }
    }

    #[tokio::test]
    async fn requests_are_sequential() {
        let server = MockServer::start().await;
        respond_with(
            &server,
            ResponseTemplate::new(200).set_delay(Duration::from_millis(100)),
        )
        .await;

        let started = Instant::now();
        let state = worker(0, config(server.uri(), 0.45, 0), ProgressBar::hidden())
            .await
            .unwrap();

        // one request at a time: the run lasts at least as long as the delays add up
        assert!(state.requests >= 1);
        assert!(started.elapsed() >= Duration::from_millis(100) * state.requests as u32);
    }

    #[tokio::test]
    async fn server_error_ends_the_worker() {
        let server = MockServer::start().await;
        respond_with(&server, ResponseTemplate::new(500)).await;

        let err = worker(0, config(server.uri(), 1.0, 0), ProgressBar::hidden())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WorkerError::Status { status } if status == reqwest::StatusCode::INTERNAL_SERVER_ERROR
        ));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn error_status_wins_over_the_body() {
        let server = MockServer::start().await;
        respond_with(
            &server,
            ResponseTemplate::new(503).set_body_string("x".repeat(64 * 1024)),
        )
        .await;

        let err = worker(0, config(server.uri(), 1.0, 0), ProgressBar::hidden())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WorkerError::Status { status } if status == reqwest::StatusCode::SERVICE_UNAVAILABLE
        ));
    }

    #[tokio::test]
    async fn empty_uri_fails_before_any_request() {
        let err = worker(0, config(String::new(), 1.0, 0), ProgressBar::hidden())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::InvalidUri { .. }));
    }

    #[tokio::test]
    async fn unreachable_target_ends_the_worker() {
        // not taken from the shared pool, so dropping it closes the port
        let uri = {
            let server = MockServer::builder().start().await;
            server.uri()
        };

        let err = worker(0, config(uri, 1.0, 0), ProgressBar::hidden())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::Request(_)));
    }
}
