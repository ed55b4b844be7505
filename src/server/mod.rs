//! Delivery surface: WebSocket connections feeding the subscription registry

pub mod session;
pub mod websocket;

pub use session::{Route, Session, SessionContext};
pub use websocket::WebSocketServer;
