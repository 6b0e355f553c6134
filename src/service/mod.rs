//! Service Layer
//!
//! Single-writer async front for the arena and its message protocol.
//! This layer is **non-deterministic** (wall clock, task scheduling); all
//! arena logic runs through `arena/`.

pub mod protocol;
pub mod handle;

pub use protocol::{ArenaRequest, ArenaResponse, ErrorPayload};
pub use handle::{ArenaService, Clock, ManualClock, SystemClock, EVENT_CHANNEL_CAPACITY};
