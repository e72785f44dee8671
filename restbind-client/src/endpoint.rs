//! The generated operation for one endpoint declaration.
//!
//! Every invocation runs on a task spawned on the client's runtime: the
//! request is built, sent, and its completions are fed through one
//! delivery routine that binds each response and fires exactly one of the
//! success handler or the error router. HTTP and JSONP calls complete at
//! most once; a WebSocket call owns its connection and its delivery loop
//! runs until the connection closes.

use crate::client::ClientInner;
use crate::pending::{CallState, PendingCall};
use crate::request::{RequestBuilder, RequestTarget};
use crate::router::{DiagnosticSink, ErrorHandler, ErrorRouter};
use restbind_core::{
    BindError, CallArguments, CallId, ConfigError, EndpointDescriptor, Failure, Model, Payload,
    Receive,
};
use restbind_transport::{HttpRequest, TransportError, WebSocketClient, WebSocketConnection};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Success handler: the originating model instance and the bound response.
pub type ReceiveHandler<M, R> = Arc<dyn Fn(&M, R) + Send + Sync>;

/// WebSocket lifecycle hook.
pub type LifecycleHook<M> = Arc<dyn Fn(&M) + Send + Sync>;

pub struct EndpointBuilder<M, R, P> {
    client: Arc<ClientInner>,
    descriptor: Arc<EndpointDescriptor>,
    on_receive: Option<ReceiveHandler<M, R>>,
    error_handlers: HashMap<String, ErrorHandler<M>>,
    on_open: Option<LifecycleHook<M>>,
    on_close: Option<LifecycleHook<M>>,
    sink: Option<Arc<dyn DiagnosticSink>>,
    _payload: PhantomData<fn(P)>,
}

impl<M, R, P> fmt::Debug for EndpointBuilder<M, R, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointBuilder")
            .field("descriptor", &self.descriptor)
            .field("error_handlers", &self.error_handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<M, R, P> EndpointBuilder<M, R, P>
where
    M: Model,
    R: Receive,
    P: Payload,
{
    pub(crate) fn new(client: Arc<ClientInner>, descriptor: Arc<EndpointDescriptor>) -> Self {
        Self {
            client,
            descriptor,
            on_receive: None,
            error_handlers: HashMap::new(),
            on_open: None,
            on_close: None,
            sink: None,
            _payload: PhantomData,
        }
    }

    pub fn on_receive<F>(mut self, handler: F) -> Self
    where
        F: Fn(&M, R) + Send + Sync + 'static,
    {
        self.on_receive = Some(Arc::new(handler));
        self
    }

    /// Register an error operation under `name`. The descriptor's
    /// `on_error` picks which registered operation receives failures.
    pub fn error_handler<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&M, Failure) + Send + Sync + 'static,
    {
        self.error_handlers.insert(name.into(), Arc::new(handler));
        self
    }

    pub fn on_open<F>(mut self, hook: F) -> Self
    where
        F: Fn(&M) + Send + Sync + 'static,
    {
        self.on_open = Some(Arc::new(hook));
        self
    }

    pub fn on_close<F>(mut self, hook: F) -> Self
    where
        F: Fn(&M) + Send + Sync + 'static,
    {
        self.on_close = Some(Arc::new(hook));
        self
    }

    /// Replace the diagnostic sink used when no error operation is declared.
    pub fn sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<Endpoint<M, R, P>, ConfigError> {
        let bound = P::type_name();
        if self.descriptor.payload_type() != bound {
            return Err(ConfigError::PayloadTypeMismatch {
                declared: self.descriptor.payload_type().map(str::to_string),
                bound: bound.map(str::to_string),
            });
        }

        let sink = self.sink.unwrap_or_else(|| Arc::clone(&self.client.sink));
        let router = ErrorRouter::resolve(&self.descriptor, &self.error_handlers, sink)?;
        debug!(
            "Built endpoint {} ({}) binding {}",
            self.descriptor.name(),
            self.descriptor.transport(),
            M::type_name()
        );

        Ok(Endpoint {
            inner: Arc::new(EndpointInner {
                client: self.client,
                descriptor: self.descriptor,
                on_receive: self.on_receive,
                router,
                on_open: self.on_open,
                on_close: self.on_close,
                connections: RwLock::new(HashMap::new()),
                connecting: Mutex::new(HashMap::new()),
                _payload: PhantomData,
            }),
        })
    }
}

/// An open WebSocket connection and the call that owns its delivery loop.
#[derive(Debug, Clone)]
struct OpenSocket {
    connection: WebSocketConnection,
    stop: CancellationToken,
    owner: CallId,
}

struct EndpointInner<M, R, P> {
    client: Arc<ClientInner>,
    descriptor: Arc<EndpointDescriptor>,
    on_receive: Option<ReceiveHandler<M, R>>,
    router: ErrorRouter<M>,
    on_open: Option<LifecycleHook<M>>,
    on_close: Option<LifecycleHook<M>>,
    /// Keyed by rendered URL.
    connections: RwLock<HashMap<String, OpenSocket>>,
    /// Per-URL gates so that only one handshake to a URL is in flight.
    connecting: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    _payload: PhantomData<fn(P)>,
}

/// A built, validated endpoint operation. Cheap to clone.
pub struct Endpoint<M, R, P = ()> {
    inner: Arc<EndpointInner<M, R, P>>,
}

impl<M, R, P> Clone for Endpoint<M, R, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M, R, P> fmt::Debug for Endpoint<M, R, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("descriptor", &self.inner.descriptor)
            .field("router", &self.inner.router)
            .finish()
    }
}

impl<M, R, P> Endpoint<M, R, P>
where
    M: Model,
    R: Receive,
    P: Payload,
{
    pub fn descriptor(&self) -> &EndpointDescriptor {
        &self.inner.descriptor
    }

    /// Invoke with positional arguments, in [`EndpointDescriptor::parameters`]
    /// order.
    pub fn call(&self, model: M, args: &[&str]) -> CallId {
        let args = CallArguments::positional(self.inner.descriptor.parameters(), args);
        self.invoke(model, args, None)
    }

    /// Invoke with positional arguments and a payload.
    pub fn send(&self, model: M, args: &[&str], payload: P) -> CallId {
        let args = CallArguments::positional(self.inner.descriptor.parameters(), args);
        self.invoke(model, args, Some(payload))
    }

    /// Start one invocation and return immediately. The outcome is
    /// delivered to the registered handlers from a runtime task, never from
    /// this call.
    pub fn invoke(&self, model: M, args: CallArguments, payload: Option<P>) -> CallId {
        let inner = &self.inner;
        let call = PendingCall::new(inner.client.ids.allocate(), inner.descriptor.transport());
        let id = call.id();

        let body = payload.map(|payload| payload.to_body());
        if body.is_none() {
            if let Some(verb) = inner.descriptor.method().verb() {
                if verb.requires_payload() {
                    warn!("{} {} invoked without a payload", inner.descriptor.name(), id);
                }
            }
        }
        debug!("{} invoked {}", id, inner.descriptor.name());

        let this = Arc::clone(inner);
        inner
            .client
            .runtime
            .spawn(async move { this.run(call, model, args, body).await });
        id
    }

    /// Close every WebSocket connection this endpoint has open. Frames that
    /// have not been delivered yet are discarded.
    pub async fn close(&self) {
        let mut connections = self.inner.connections.write().await;
        for (url, open) in connections.drain() {
            info!("Closing WebSocket {} owned by {}", url, open.owner);
            open.stop.cancel();
            open.connection.close();
        }
    }

    /// Number of WebSocket connections currently open.
    pub async fn open_connections(&self) -> usize {
        self.inner.connections.read().await.len()
    }
}

impl<M, R, P> EndpointInner<M, R, P>
where
    M: Model,
    R: Receive,
    P: Payload,
{
    fn step(&self, call: &mut PendingCall, to: CallState) {
        if let Err(err) = call.advance(to) {
            warn!("{}", err);
        }
    }

    fn fail(&self, call: &mut PendingCall, model: &M, failure: Failure) {
        self.step(call, CallState::Failed);
        self.router.route(call.id(), model, failure);
    }

    async fn run(self: Arc<Self>, mut call: PendingCall, model: M, args: CallArguments, body: Option<Value>) {
        self.step(&mut call, CallState::Building);
        let target = RequestBuilder::new(&self.descriptor, &self.client.config.default_headers)
            .build(call.id(), &args, body, &self.client.jsonp);
        let target = match target {
            Ok(target) => target,
            Err(failure) => {
                debug!("{} could not be built: {}", call.id(), failure);
                self.fail(&mut call, &model, failure);
                return;
            }
        };

        match target {
            RequestTarget::Http(request) => self.run_http(call, model, request, None).await,
            RequestTarget::Jsonp { request, callback } => {
                self.run_http(call, model, request, Some(callback)).await
            }
            RequestTarget::WebSocket { url, frame } => {
                self.run_websocket(call, model, url, frame).await
            }
        }
    }

    async fn run_http(
        &self,
        mut call: PendingCall,
        model: M,
        request: HttpRequest,
        callback: Option<String>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel::<Result<String, TransportError>>();
        self.step(&mut call, CallState::Sent);

        let outcome = self.exchange(call.id(), request, callback.as_deref()).await;
        if outcome.is_err() {
            if let Some(callback) = &callback {
                self.client.jsonp.forget(callback);
            }
        }
        let _ = tx.send(outcome);
        drop(tx);

        self.deliver(&mut call, model, rx, None).await;
    }

    async fn exchange(
        &self,
        call: CallId,
        request: HttpRequest,
        callback: Option<&str>,
    ) -> Result<String, TransportError> {
        let body = self
            .client
            .exchange
            .execute(request)
            .await?
            .into_success()?;
        match callback {
            Some(_) => self.client.jsonp.capture(call, &body),
            None => Ok(body),
        }
    }

    /// Live connection for `url`, if one is open.
    async fn open_socket(&self, url: &str) -> Option<OpenSocket> {
        self.connections
            .read()
            .await
            .get(url)
            .filter(|open| !open.connection.is_closed())
            .cloned()
    }

    async fn gate(&self, url: &str) -> Arc<Mutex<()>> {
        let mut connecting = self.connecting.lock().await;
        Arc::clone(connecting.entry(url.to_string()).or_default())
    }

    /// Drop the gate for `url` once nobody else is waiting on it.
    async fn release_gate(&self, url: &str, gate: Arc<Mutex<()>>) {
        let mut connecting = self.connecting.lock().await;
        drop(gate);
        if connecting
            .get(url)
            .is_some_and(|gate| Arc::strong_count(gate) == 1)
        {
            connecting.remove(url);
        }
    }

    async fn run_websocket(
        &self,
        mut call: PendingCall,
        model: M,
        url: String,
        frame: Option<String>,
    ) {
        // The handshake runs under the URL's gate only; the connection map
        // is never held across it.
        let gate = self.gate(&url).await;
        let connected = {
            let _connecting = gate.lock().await;
            if let Some(open) = self.open_socket(&url).await {
                Err(Some(open))
            } else {
                self.step(&mut call, CallState::Sent);
                let timeout = Duration::from_millis(self.client.config.connect_timeout_ms);
                match WebSocketClient::new(url.as_str())
                    .connect_timeout(timeout)
                    .connect()
                    .await
                {
                    Ok((connection, inbound)) => {
                        let socket = OpenSocket {
                            connection,
                            stop: CancellationToken::new(),
                            owner: call.id(),
                        };
                        self.connections
                            .write()
                            .await
                            .insert(url.clone(), socket.clone());
                        Ok((socket, inbound))
                    }
                    Err(err) => {
                        self.fail(&mut call, &model, err.into());
                        Err(None)
                    }
                }
            }
        };
        self.release_gate(&url, gate).await;

        let (socket, inbound) = match connected {
            Ok(connected) => connected,
            Err(Some(open)) => {
                self.reuse(call, &model, open, frame);
                return;
            }
            Err(None) => return,
        };

        self.step(&mut call, CallState::Open);
        if let Some(hook) = &self.on_open {
            hook(&model);
        }
        if let Some(frame) = frame {
            if let Err(err) = socket.connection.send_text(frame) {
                self.fail(&mut call, &model, err.into());
                self.step(&mut call, CallState::Open);
            }
        }

        let model = self.deliver(&mut call, model, inbound, Some(&socket.stop)).await;

        {
            let mut connections = self.connections.write().await;
            if connections.get(&url).map(|open| open.owner) == Some(call.id()) {
                connections.remove(&url);
            }
        }
        socket.connection.close();
        self.step(&mut call, CallState::Closed);
        info!("{} closed WebSocket {}", call.id(), url);
        if let Some(hook) = &self.on_close {
            hook(&model);
        }
    }

    /// Send on a connection another call opened. Responses keep flowing to
    /// that call's delivery loop.
    fn reuse(&self, mut call: PendingCall, model: &M, open: OpenSocket, frame: Option<String>) {
        self.step(&mut call, CallState::Sent);
        debug!(
            "{} reusing {} opened by {}",
            call.id(),
            open.connection.url(),
            open.owner
        );
        if let Some(frame) = frame {
            if let Err(err) = open.connection.send_text(frame) {
                self.fail(&mut call, model, err.into());
                return;
            }
        }
        trace!(
            "{} handed off to {}; its replies are delivered there",
            call.id(),
            open.owner
        );
    }

    /// Shared completion routine. Binds each completion onto `R` and fires
    /// exactly one handler for it; returns the model once the stream ends or
    /// `stop` is cancelled.
    async fn deliver<E>(
        &self,
        call: &mut PendingCall,
        model: M,
        mut completions: mpsc::UnboundedReceiver<Result<String, E>>,
        stop: Option<&CancellationToken>,
    ) -> M
    where
        E: Send,
        Failure: From<E>,
    {
        let streaming = call.transport().is_websocket();
        loop {
            let next = match stop {
                Some(stop) => tokio::select! {
                    biased;
                    _ = stop.cancelled() => None,
                    next = completions.recv() => next,
                },
                None => completions.recv().await,
            };
            let Some(completion) = next else {
                break;
            };

            let outcome = completion
                .map_err(Failure::from)
                .and_then(|text| {
                    R::from_text(&text).map_err(<Failure as From<BindError>>::from)
                });
            match outcome {
                Ok(response) => {
                    self.step(call, CallState::Completed);
                    match &self.on_receive {
                        Some(handler) => handler(&model, response),
                        None => debug!("{} completed with no receive handler", call.id()),
                    }
                }
                Err(failure) => self.fail(call, &model, failure),
            }

            if !streaming {
                break;
            }
            self.step(call, CallState::Open);
        }
        model
    }
}
