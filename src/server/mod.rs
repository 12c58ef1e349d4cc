//! Transport layer exposing the engine to clients

pub mod websocket;

pub use websocket::ScoreGateway;
