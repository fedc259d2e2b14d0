//! A transport-agnostic YMODEM engine.
//!
//! This crate implements the protocol state machines only: CRC16 framing,
//! a tick-driven retry/timeout model, and the receiver and sender
//! six-stage progressions. It owns no transport and no filesystem access —
//! the host supplies a non-blocking byte [`Transport`] and an application
//! [`Handler`], then drives the engine with [`Engine::pump_receive`] or
//! [`Engine::pump_transmit`] on a fixed cadence (roughly every 10ms is a
//! reasonable default, matching common serial read timeouts).
//!
//! No wall-clock time is ever consulted; all timing is counted in pumps.

pub mod consts;
pub mod crc;
mod engine;
pub mod error;
pub mod event;
mod frame;
pub mod packet;
mod receiver;
mod sender;
pub mod stage;
pub mod timing;
pub mod transport;

pub use consts::Config;
pub use engine::Engine;
pub use error::DemoError;
pub use event::{Decision, Event, Handler};
pub use stage::Stage;
pub use transport::{IoTransport, Transport};
