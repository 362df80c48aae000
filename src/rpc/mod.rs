//! Network command surface.
//!
//! HTTP/1.x over TCP, one request per connection. Validation happens on
//! the I/O thread; only fully validated commands reach the drive worker.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                     Network Stack                          │
//! │                                                            │
//! │  ┌───────────┐   ┌──────────┐   ┌───────────┐             │
//! │  │ Transport │──▶│  Codec   │──▶│  Request  │             │
//! │  │ (TCP)     │   │ (HTTP)   │   │ (JSON)    │             │
//! │  └───────────┘   └──────────┘   └─────┬─────┘             │
//! │       ▲        I/O thread             │ DriveChannels     │
//! │       │                               ▼                   │
//! │       │  ResponseMsg          ┌──────────────────┐        │
//! │       └───────────────────────│ Engine (worker)  │        │
//! │                               │  → DriveService  │        │
//! │                               └──────────────────┘        │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod channels;
pub mod codec;
pub mod engine;
pub mod io_task;
pub mod request;
