//! Transport-neutral frames.
//!
//! The client pumps speak [`Frame`] over any `Sink<Frame>` /
//! `Stream<Item = Result<Frame, E>>` pair. The axum socket is adapted with
//! the `From` conversions below; tests use in-memory channels instead.

use axum::extract::ws::{CloseFrame, Message};

/// Close code sent when a client is torn down normally.
pub const CLOSE_NORMAL: u16 = 1000;

/// Close code sent when the hub is shutting down.
pub const CLOSE_GOING_AWAY: u16 = 1001;

/// Reason attached to a close frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloseReason {
    /// WebSocket close code.
    pub code: u16,
    /// Human-readable reason.
    pub reason: String,
}

impl CloseReason {
    /// Build a close reason.
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// One transport frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 data frame.
    Text(String),
    /// Binary data frame.
    Binary(Vec<u8>),
    /// Keepalive probe.
    Ping(Vec<u8>),
    /// Keepalive response.
    Pong(Vec<u8>),
    /// Close handshake.
    Close(Option<CloseReason>),
}

impl From<Message> for Frame {
    fn from(msg: Message) -> Self {
        match msg {
            Message::Text(text) => Self::Text(text.as_str().to_owned()),
            Message::Binary(data) => Self::Binary(data.to_vec()),
            Message::Ping(data) => Self::Ping(data.to_vec()),
            Message::Pong(data) => Self::Pong(data.to_vec()),
            Message::Close(frame) => {
                Self::Close(frame.map(|f| CloseReason::new(f.code, f.reason.as_str())))
            }
        }
    }
}

impl From<Frame> for Message {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => Self::Text(text.into()),
            Frame::Binary(data) => Self::Binary(data.into()),
            Frame::Ping(data) => Self::Ping(data.into()),
            Frame::Pong(data) => Self::Pong(data.into()),
            Frame::Close(reason) => Self::Close(reason.map(|r| CloseFrame {
                code: r.code,
                reason: r.reason.into(),
            })),
        }
    }
}
