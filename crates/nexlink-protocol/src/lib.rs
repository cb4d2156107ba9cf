//! Nextion HMI Serial Protocol
//!
//! This crate provides the wire-level types for talking to a Nextion-class
//! touchscreen panel over a serial link. The host sends terminated 8-bit text
//! instructions and the panel answers with binary frames.
//!
//! # Protocol Overview
//!
//! - **Instructions** (host → panel): text such as `t0.txt="Hi"` or `get n0.val`,
//!   followed by the `FF FF FF` terminator
//! - **Frames** (panel → host): a leading code byte, an optional payload and the
//!   same `FF FF FF` terminator
//!
//! A frame is either the response to the instruction in flight (success, fault,
//! string or number value, current page) or an asynchronous event (touch).
//! The protocol carries no request IDs, so correlation is left to the caller.
//!
//! # Example
//!
//! ```rust
//! use nexlink_protocol::{encode_instruction, Event, Param};
//!
//! let wire = encode_instruction("page", &[Param::from(1u32)]).unwrap();
//! assert_eq!(wire, b"page 1\xFF\xFF\xFF");
//!
//! let event = Event::parse(b"\x01\xFF\xFF\xFF").unwrap();
//! assert_eq!(event, Event::CommandSucceeded);
//! ```

mod constants;
mod encode;
mod error;
mod events;
mod frame;

pub use constants::*;
pub use encode::*;
pub use error::*;
pub use events::*;
pub use frame::*;
