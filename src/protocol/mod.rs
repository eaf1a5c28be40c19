//! Wire protocol
//!
//! Newline-delimited JSON in both directions. Clients send [`Request`] objects;
//! the server answers one-shot requests with a [`Response`] and pushes raw
//! [`Record`] objects to observers.

pub mod constants;
pub mod framing;
pub mod message;

pub use framing::{encode_frame, FrameError, Framer, Frames};
pub use message::{Action, Record, Request, RequestError, Response};
