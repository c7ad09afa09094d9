// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! kz-core: Shared types for the Kuzzle client SDK.
//!
//! This crate provides the wire protocol messages, the error taxonomy and
//! the clock abstraction used by the `kuzzle` SDK and the `kz` CLI.

pub mod clock;
pub mod error;
pub mod protocol;

pub use clock::{ClockSource, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use protocol::{
    ApiError, Notification, NotificationType, Request, Response, ServerMessage,
};
