pub mod transport;
#[cfg(feature = "http")]
pub mod http;
pub mod jsonp;
#[cfg(feature = "websocket")]
pub mod websocket;

pub use jsonp::{attach_callback, parse_padding, JsonpRegistry};
pub use transport::{HttpExchange, HttpRequest, HttpResponse, TransportError, JSON_CONTENT_TYPE};
#[cfg(feature = "http")]
pub use http::ReqwestExchange;
#[cfg(feature = "websocket")]
pub use websocket::{Inbound, WebSocketClient, WebSocketConnection, DEFAULT_CONNECT_TIMEOUT};
