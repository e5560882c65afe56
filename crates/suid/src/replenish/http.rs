use core::{future::Future, time::Duration};

use reqwest::{Client, header::RETRY_AFTER};

use crate::replenish::{Response, Transport, TransportError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A [`Transport`] issuing `GET <url>?blocks=<n>` with `reqwest`.
///
/// `reqwest` drives its I/O on Tokio, so pair this transport with
/// [`TokioRuntime`](crate::TokioRuntime).
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    /// A client with a request timeout and a `suid/<version>` user agent.
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("suid/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }

    /// Uses a preconfigured client (proxies, TLS roots, timeouts).
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn request_blocks(
        &self,
        url: &str,
        blocks: usize,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send {
        let request = self.client.get(url).query(&[("blocks", blocks)]);
        async move {
            let response = request
                .send()
                .await
                .map_err(|e| TransportError::new(e.to_string()))?;
            let status = response.status().as_u16();
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);
            let body = response
                .text()
                .await
                .map_err(|e| TransportError::new(e.to_string()))?;
            Ok(Response {
                status,
                retry_after,
                body,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::{
        Router,
        extract::Query,
        http::{StatusCode, header},
        response::IntoResponse,
        routing::get,
    };
    use tokio::net::TcpListener;

    use super::*;

    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/suid/suid.json")
    }

    #[tokio::test]
    async fn sends_block_count_and_reads_body() {
        let app = Router::new().route(
            "/suid/suid.json",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let blocks: u64 = params["blocks"].parse().unwrap();
                (1000 + blocks).to_string()
            }),
        );
        let url = serve(app).await;

        let response = HttpTransport::new().request_blocks(&url, 4).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "1004");
        assert_eq!(response.retry_after, None);
    }

    #[tokio::test]
    async fn surfaces_status_and_retry_after() {
        let app = Router::new().route(
            "/suid/suid.json",
            get(|| async {
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    [(header::RETRY_AFTER, "10")],
                    "busy",
                )
                    .into_response()
            }),
        );
        let url = serve(app).await;

        let response = HttpTransport::default()
            .request_blocks(&url, 1)
            .await
            .unwrap();
        assert_eq!(response.status, 503);
        assert_eq!(response.retry_after.as_deref(), Some("10"));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = HttpTransport::new()
            .request_blocks(&format!("http://{addr}/suid"), 1)
            .await;
        assert!(result.is_err());
    }
}
