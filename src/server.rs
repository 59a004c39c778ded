//! DNS request handling for the zone resolver
//!
//! [`ZoneDns`] owns the zone cache, its refresh loop, and the resolution engine, and
//! exposes them to a DNS server as a hickory [`RequestHandler`] (for `ServerFuture`)
//! and as a [`tower::Service`] returning the response [`Message`].
//!
//! Every request maps onto exactly one response code:
//!
//! | Request | Response |
//! |---|---|
//! | resolved query | authoritative `NoError` with answers |
//! | unknown name, or zone not cached | `NXDomain` |
//! | known name, unanswerable type | `ServFail` |
//! | not exactly one question | `FormErr` |
//! | op code other than `Query` | `NotImp` |
//! | response received as a request | `FormErr` |

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use hickory_proto::op::{Header, Message, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::Record;
use hickory_server::authority::{MessageResponse, MessageResponseBuilder};
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};
use tokio_util::sync::CancellationToken;

use crate::catalog::{CatalogError, ZoneReader};
use crate::config::ZoneDnsConfig;
use crate::error::{BuildError, HickoryError};
use crate::refresh::{RefreshHandle, RefreshLoop};
use crate::resolve::{QueryType, ResolutionEngine};
use crate::zones::ZoneTable;

enum Reply {
    Answers(Vec<Record>),
    Error(ResponseCode),
}

#[tracing::instrument(skip_all, fields(op=%request.op_code(), id=%request.id()), level = "debug")]
async fn reply(engine: &ResolutionEngine, request: &Request) -> Reply {
    if request.op_code() != OpCode::Query {
        tracing::warn!("Unimplemented op code: {}", request.op_code());
        return Reply::Error(ResponseCode::NotImp);
    }

    if request.queries().len() != 1 {
        tracing::debug!("expected exactly one question, got {}", request.queries().len());
        return Reply::Error(ResponseCode::FormErr);
    }

    let request_info = match request.request_info() {
        Ok(request_info) => request_info,
        Err(error) => {
            tracing::debug!("Invalid request format: {error}");
            return Reply::Error(ResponseCode::FormErr);
        }
    };

    let query = request_info.query.original();
    match engine
        .resolve(query.name(), QueryType::from(query.query_type()))
        .await
    {
        Ok(resolved) => Reply::Answers(resolved.into_answers()),
        Err(unresolved) => {
            tracing::debug!(reason = %unresolved, "query not resolved");
            Reply::Error(unresolved.response_code())
        }
    }
}

fn answer_header(request: &Request) -> Header {
    let mut header = Header::response_from_request(request.header());
    header.set_authoritative(true);
    header.set_response_code(ResponseCode::NoError);
    header
}

/// Authoritative DNS service for the zone catalogue.
pub struct ZoneDns {
    engine: ResolutionEngine,
    refresh: Option<RefreshHandle>,
    shutdown: CancellationToken,
}

impl fmt::Debug for ZoneDns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZoneDns")
            .field("engine", &self.engine)
            .field("refreshing", &self.refresh.is_some())
            .finish()
    }
}

impl ZoneDns {
    /// Build the service from a catalogue reader.
    ///
    /// The zone table is seeded with one synchronous fetch before the refresh loop
    /// starts, so no query is ever served without zone data. Must be called inside a
    /// tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid, or the seed fetch fails or outlasts the
    /// lookup timeout.
    pub async fn build(
        reader: Arc<dyn ZoneReader>,
        config: &ZoneDnsConfig,
    ) -> Result<Self, BuildError> {
        config.validate()?;

        let timeout = config.lookup_timeout();
        let zones = tokio::time::timeout(timeout, reader.fetch_zones())
            .await
            .map_err(|_| BuildError::Seed(CatalogError::Timeout(timeout)))?
            .map_err(BuildError::Seed)?;
        tracing::info!(zones = zones.len(), "seeded zone table");
        let table = Arc::new(ZoneTable::new(zones));

        let shutdown = CancellationToken::new();
        let refresh = RefreshLoop::new(reader.clone(), table.clone(), config.refresh_interval())
            .with_fetch_timeout(timeout)
            .with_cancellation(shutdown.clone())
            .spawn();

        let engine = ResolutionEngine::new(reader, table, config.ttl(), config.lookup_timeout());

        Ok(Self {
            engine,
            refresh: Some(refresh),
            shutdown,
        })
    }

    /// Wrap an engine whose zone table is maintained elsewhere.
    pub fn new(engine: ResolutionEngine) -> Self {
        Self {
            engine,
            refresh: None,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn engine(&self) -> &ResolutionEngine {
        &self.engine
    }

    pub fn zones(&self) -> &Arc<ZoneTable> {
        self.engine.zones()
    }

    /// A token which stops the refresh loop when cancelled.
    ///
    /// Useful once the service has been handed to a server and can no longer be
    /// shut down directly.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop the refresh loop and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(refresh) = self.refresh.take() {
            refresh.shutdown().await;
        }
    }

    async fn respond_error_code<R: ResponseHandler>(
        &self,
        response_handle: &mut R,
        request: &Request,
        response_code: ResponseCode,
    ) -> ResponseInfo {
        self.respond(
            response_handle,
            MessageResponseBuilder::from_message_request(request)
                .error_msg(request.header(), response_code),
        )
        .await
    }

    async fn respond<'q, 'a, R: ResponseHandler>(
        &self,
        response_handle: &mut R,
        message: MessageResponse<
            'q,
            'a,
            impl Iterator<Item = &'a Record> + Send,
            impl Iterator<Item = &'a Record> + Send,
            impl Iterator<Item = &'a Record> + Send,
            impl Iterator<Item = &'a Record> + Send,
        >,
    ) -> ResponseInfo {
        match response_handle.send_response(message).await {
            Ok(info) => info,
            Err(error) => {
                tracing::error!("Send error: {error}");
                let mut header = Header::new();
                header.set_response_code(ResponseCode::ServFail);
                header.into()
            }
        }
    }
}

#[async_trait::async_trait]
impl RequestHandler for ZoneDns {
    async fn handle_request<R>(&self, request: &Request, mut response_handle: R) -> ResponseInfo
    where
        R: ResponseHandler,
    {
        if request.message_type() == MessageType::Response {
            tracing::warn!("got a response as a request from id: {}", request.id());
            return self
                .respond_error_code(&mut response_handle, request, ResponseCode::FormErr)
                .await;
        }

        match reply(&self.engine, request).await {
            Reply::Answers(answers) => {
                let message = MessageResponseBuilder::from_message_request(request).build(
                    answer_header(request),
                    answers.iter(),
                    std::iter::empty(),
                    std::iter::empty(),
                    std::iter::empty(),
                );
                self.respond(&mut response_handle, message).await
            }
            Reply::Error(code) => {
                self.respond_error_code(&mut response_handle, request, code)
                    .await
            }
        }
    }
}

impl tower::Service<Request> for ZoneDns {
    type Response = Message;

    type Error = HickoryError;

    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let engine = self.engine.clone();
        Box::pin(async move {
            if request.message_type() == MessageType::Response {
                tracing::warn!("got a response as a request from id: {}", request.id());
                return Err(HickoryError::ResponseAsRequest);
            }

            let message = match reply(&engine, &request).await {
                Reply::Answers(answers) => {
                    let mut message = Message::new();
                    message.set_header(answer_header(&request));
                    message.add_queries(request.queries().iter().map(|q| q.original().clone()));
                    message.add_answers(answers);
                    message
                }
                Reply::Error(code) => Message::error_msg(request.id(), request.op_code(), code),
            };
            Ok(message)
        })
    }
}
