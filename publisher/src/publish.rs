//! Manifest upload to the registry index.
//!
//! Each manifest is stored with a single `PUT` of its JSON body. The index
//! treats the request as idempotent, so a failed upload may be repeated; how
//! often (if at all) is decided by a [`RetryStrategy`]. The default is
//! [`NoRetry`]: the first failure aborts the release.

use log::{debug, warn};
use std::thread;
use std::time::Duration;

/// Content type of manifest uploads.
const JSON_CONTENT_TYPE: &str = "application/json";

/// Trait for storing manifests in the registry index.
///
/// Abstractions allow tests to observe uploads without network access.
#[cfg_attr(test, mockall::automock)]
pub trait IndexPublisher {
    /// Upload `json` to `url` and return the response body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the index rejects it.
    fn put_manifest(&self, url: &str, json: &str) -> Result<String, PublishError>;
}

/// Errors arising from manifest uploads.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The index answered with a non-success status.
    #[error("upload to {url} was rejected with HTTP {status}")]
    Status {
        /// The URL that was requested.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The request could not be completed.
    #[error("upload to {url} failed: {reason}")]
    Http {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },
}

impl PublishError {
    /// Returns `true` when repeating the request could succeed.
    ///
    /// Transport failures and server errors are transient; client errors
    /// (4xx) are not.
    ///
    /// # Examples
    ///
    /// ```
    /// use provider_index_publisher::publish::PublishError;
    ///
    /// let busy = PublishError::Status { url: "u".to_owned(), status: 503 };
    /// let denied = PublishError::Status { url: "u".to_owned(), status: 403 };
    /// assert!(busy.is_transient());
    /// assert!(!denied.is_transient());
    /// ```
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500,
            Self::Http { .. } => true,
        }
    }
}

/// Decides whether and when a failed upload is attempted again.
pub trait RetryStrategy {
    /// Returns the delay before the next attempt, or `None` to give up.
    ///
    /// `attempt` counts the attempts made so far, starting at 1.
    fn next_delay(&self, attempt: u32, error: &PublishError) -> Option<Duration>;
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryStrategy for NoRetry {
    fn next_delay(&self, _attempt: u32, _error: &PublishError) -> Option<Duration> {
        None
    }
}

/// Retries transient failures a fixed number of times with a constant delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay {
    /// Number of retries after the first attempt.
    pub retries: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl RetryStrategy for FixedDelay {
    fn next_delay(&self, attempt: u32, error: &PublishError) -> Option<Duration> {
        (error.is_transient() && attempt <= self.retries).then_some(self.delay)
    }
}

/// Runs `operation` until it succeeds or `strategy` gives up.
///
/// `sleep` is called with each delay the strategy requests.
///
/// # Errors
///
/// Returns the last error once the strategy stops retrying.
pub fn with_retry<T, F, S>(
    strategy: &dyn RetryStrategy,
    mut operation: F,
    mut sleep: S,
) -> Result<T, PublishError>
where
    F: FnMut() -> Result<T, PublishError>,
    S: FnMut(Duration),
{
    let mut attempt = 1;
    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(err) => {
                let Some(delay) = strategy.next_delay(attempt, &err) else {
                    return Err(err);
                };
                warn!("attempt {attempt} failed ({err}); retrying in {delay:?}");
                sleep(delay);
                attempt += 1;
            }
        }
    }
}

/// HTTP publisher using `ureq`.
pub struct HttpPublisher {
    agent: ureq::Agent,
    retry: Box<dyn RetryStrategy>,
}

impl HttpPublisher {
    /// Creates a publisher.
    ///
    /// `timeout` bounds each request; `None` keeps the transport default.
    #[must_use]
    pub fn new(timeout: Option<Duration>, retry: Box<dyn RetryStrategy>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(timeout)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            retry,
        }
    }

    fn put_once(&self, url: &str, json: &str) -> Result<String, PublishError> {
        debug!("PUT {url} ({} bytes)", json.len());
        let response = self
            .agent
            .put(url)
            .header("Content-Type", JSON_CONTENT_TYPE)
            .send(json)
            .map_err(|e| map_ureq_error(url, &e))?;
        response
            .into_body()
            .read_to_string()
            .map_err(|e| PublishError::Http {
                url: url.to_owned(),
                reason: e.to_string(),
            })
    }
}

impl Default for HttpPublisher {
    fn default() -> Self {
        Self::new(None, Box::new(NoRetry))
    }
}

impl IndexPublisher for HttpPublisher {
    fn put_manifest(&self, url: &str, json: &str) -> Result<String, PublishError> {
        with_retry(
            self.retry.as_ref(),
            || self.put_once(url, json),
            thread::sleep,
        )
    }
}

/// Map a ureq error to a [`PublishError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> PublishError {
    match err {
        ureq::Error::StatusCode(status) => PublishError::Status {
            url: url.to_owned(),
            status: *status,
        },
        other => PublishError::Http {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::cell::RefCell;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};

    fn server_error() -> PublishError {
        PublishError::Status {
            url: "https://index.example.test/1.0.0/download/linux/amd64".to_owned(),
            status: 502,
        }
    }

    #[rstest]
    fn map_ureq_error_keeps_status_code() {
        let mapped = map_ureq_error("https://index.example.test/x", &ureq::Error::StatusCode(409));
        assert!(matches!(mapped, PublishError::Status { status: 409, .. }));
    }

    #[rstest]
    fn map_ureq_error_maps_other_errors_to_http() {
        let err = ureq::Error::Io(std::io::Error::other("connection reset"));
        let mapped = map_ureq_error("https://index.example.test/x", &err);
        assert!(matches!(mapped, PublishError::Http { .. }));
    }

    #[rstest]
    fn no_retry_gives_up_immediately() {
        let calls = RefCell::new(0);
        let sleeps = RefCell::new(Vec::new());

        let result: Result<(), _> = with_retry(
            &NoRetry,
            || {
                *calls.borrow_mut() += 1;
                Err(server_error())
            },
            |d| sleeps.borrow_mut().push(d),
        );

        assert!(result.is_err());
        assert_eq!(*calls.borrow(), 1);
        assert!(sleeps.borrow().is_empty());
    }

    #[rstest]
    fn fixed_delay_retries_transient_failures_until_success() {
        let strategy = FixedDelay {
            retries: 3,
            delay: Duration::from_millis(250),
        };
        let calls = RefCell::new(0);
        let sleeps = RefCell::new(Vec::new());

        let result = with_retry(
            &strategy,
            || {
                *calls.borrow_mut() += 1;
                if *calls.borrow() < 3 {
                    Err(server_error())
                } else {
                    Ok("stored")
                }
            },
            |d| sleeps.borrow_mut().push(d),
        );

        assert_eq!(result.expect("third attempt succeeds"), "stored");
        assert_eq!(*sleeps.borrow(), vec![Duration::from_millis(250); 2]);
    }

    #[rstest]
    fn fixed_delay_stops_after_configured_retries() {
        let strategy = FixedDelay {
            retries: 2,
            delay: Duration::ZERO,
        };
        let calls = RefCell::new(0);

        let result: Result<(), _> = with_retry(
            &strategy,
            || {
                *calls.borrow_mut() += 1;
                Err(server_error())
            },
            |_| {},
        );

        assert!(result.is_err());
        assert_eq!(*calls.borrow(), 3);
    }

    #[rstest]
    fn fixed_delay_does_not_retry_client_errors() {
        let strategy = FixedDelay {
            retries: 5,
            delay: Duration::ZERO,
        };
        let rejected = PublishError::Status {
            url: "u".to_owned(),
            status: 401,
        };
        assert_eq!(strategy.next_delay(1, &rejected), None);
    }

    #[rstest]
    fn status_error_message_names_url_and_code() {
        let msg = server_error().to_string();
        assert!(msg.contains("download/linux/amd64"));
        assert!(msg.contains("502"));
    }

    /// A local index answering one canned response per connection.
    struct IndexStub {
        base_url: String,
        requests: thread::JoinHandle<Vec<String>>,
    }

    impl IndexStub {
        fn spawn(responses: Vec<(u16, &'static str)>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub index");
            let addr = listener.local_addr().expect("stub address");
            let requests = thread::spawn(move || {
                responses
                    .into_iter()
                    .map(|(status, body)| {
                        let (mut stream, _) = listener.accept().expect("accept");
                        stream
                            .set_read_timeout(Some(Duration::from_secs(5)))
                            .expect("read timeout");
                        let request = read_request(&mut stream);
                        let reply = format!(
                            "HTTP/1.1 {status} Stub\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                            body.len()
                        );
                        stream.write_all(reply.as_bytes()).expect("reply");
                        request
                    })
                    .collect()
            });
            Self {
                base_url: format!("http://{addr}"),
                requests,
            }
        }

        fn finish(self) -> Vec<String> {
            self.requests.join().expect("stub index thread")
        }
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut data = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let read = stream.read(&mut chunk).expect("read request");
            if read == 0 {
                break;
            }
            data.extend_from_slice(chunk.get(..read).expect("chunk"));
            let text = String::from_utf8_lossy(&data);
            if let Some((head, body)) = text.split_once("\r\n\r\n") {
                if body.len() >= content_length(head) {
                    break;
                }
            }
        }
        String::from_utf8(data).expect("utf-8 request")
    }

    fn content_length(head: &str) -> usize {
        head.lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse().ok())
            .unwrap_or(0)
    }

    #[rstest]
    fn put_sends_manifest_json_and_returns_response_body() {
        let index = IndexStub::spawn(vec![(200, "stored")]);
        let url = format!("{}/1.2.3/download/linux/amd64", index.base_url);
        let json = "{\n    \"os\": \"linux\"\n}";

        let response = HttpPublisher::default()
            .put_manifest(&url, json)
            .expect("upload succeeds");

        assert_eq!(response, "stored");
        let requests = index.finish();
        let request = requests.first().expect("one request");
        assert!(
            request.starts_with("PUT /1.2.3/download/linux/amd64 HTTP/1.1\r\n"),
            "unexpected request line: {request}"
        );
        assert!(
            request
                .to_ascii_lowercase()
                .contains("\r\ncontent-type: application/json\r\n"),
            "missing JSON content type: {request}"
        );
        assert!(request.ends_with(&format!("\r\n\r\n{json}")));
    }

    #[rstest]
    fn server_error_response_maps_to_status() {
        let index = IndexStub::spawn(vec![(503, "busy")]);
        let url = format!("{}/1.2.3/download/linux/amd64", index.base_url);

        let result = HttpPublisher::default().put_manifest(&url, "{}");

        assert!(matches!(
            result,
            Err(PublishError::Status { status: 503, url: ref failed }) if *failed == url
        ));
        assert_eq!(index.finish().len(), 1);
    }

    #[rstest]
    fn transient_failure_is_retried_against_the_index() {
        let index = IndexStub::spawn(vec![(502, ""), (200, "stored")]);
        let url = format!("{}/1.2.3/download/darwin/arm64", index.base_url);
        let publisher = HttpPublisher::new(
            Some(Duration::from_secs(5)),
            Box::new(FixedDelay {
                retries: 1,
                delay: Duration::ZERO,
            }),
        );

        let response = publisher.put_manifest(&url, "{}").expect("retry succeeds");

        assert_eq!(response, "stored");
        assert_eq!(index.finish().len(), 2);
    }
}
