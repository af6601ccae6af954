use crate::downstream::{InventoryRequest, MerchandiseRequest, PriceRequest};
use futures::future::BoxFuture;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use std::task::{Context, Poll};
use storefront_resilience::ResilienceError;
use tower::Service;

/// Describes how a request type is sent to its service.
pub trait DownstreamRequest: Serialize + Send + Sync + 'static {
    fn method(&self) -> Method;

    /// Path relative to the service's base URL, starting with `/`.
    fn path(&self) -> String;

    /// Whether the request itself is sent as a JSON body.
    fn has_body(&self) -> bool {
        self.method() != Method::GET
    }
}

impl DownstreamRequest for MerchandiseRequest {
    fn method(&self) -> Method {
        Method::GET
    }

    fn path(&self) -> String {
        format!("/merchandise/{}", self.sku)
    }
}

impl DownstreamRequest for PriceRequest {
    fn method(&self) -> Method {
        Method::POST
    }

    fn path(&self) -> String {
        "/price".to_string()
    }
}

impl DownstreamRequest for InventoryRequest {
    fn method(&self) -> Method {
        Method::POST
    }

    fn path(&self) -> String {
        "/inventory".to_string()
    }
}

/// A JSON-over-HTTP transport for one downstream service.
///
/// Outcomes map onto [`ResilienceError`]:
/// - connect or request failure: `ConnectionFailure`
/// - 5xx: `RemoteServerError`
/// - any other non-2xx: `ClientError`
/// - a body that does not decode into `Resp`: `MalformedResponse`
///
/// Per-attempt deadlines belong to the resilience pipeline; the reqwest client carries none.
pub struct HttpDownstream<Resp> {
    client: Client,
    base_url: Arc<str>,
    _response: PhantomData<fn() -> Resp>,
}

impl<Resp> HttpDownstream<Resp> {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            _response: PhantomData,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl<Resp> Clone for HttpDownstream<Resp> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: Arc::clone(&self.base_url),
            _response: PhantomData,
        }
    }
}

impl<Resp> std::fmt::Debug for HttpDownstream<Resp> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDownstream")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl<Req, Resp> Service<Req> for HttpDownstream<Resp>
where
    Req: DownstreamRequest,
    Resp: DeserializeOwned + Send + 'static,
{
    type Response = Resp;
    type Error = ResilienceError;
    type Future = BoxFuture<'static, Result<Resp, ResilienceError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let url = format!("{}{}", self.base_url, req.path());
        let mut builder = self.client.request(req.method(), url);
        if req.has_body() {
            builder = builder.json(&req);
        }

        Box::pin(async move {
            let response = builder.send().await.map_err(transport_error)?;
            let response = check_status(response).await?;
            response.json::<Resp>().await.map_err(|err| {
                if err.is_decode() {
                    ResilienceError::malformed(err.to_string())
                } else {
                    transport_error(err)
                }
            })
        })
    }
}

fn transport_error(err: reqwest::Error) -> ResilienceError {
    ResilienceError::connection(err.to_string())
}

async fn check_status(response: Response) -> Result<Response, ResilienceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, body))
}

fn status_error(status: StatusCode, body: String) -> ResilienceError {
    let message = if body.is_empty() {
        status.canonical_reason().unwrap_or("unknown status").to_string()
    } else {
        body
    };
    if status.is_server_error() {
        ResilienceError::server(status.as_u16(), message)
    } else {
        ResilienceError::client(status.as_u16(), message)
    }
}
