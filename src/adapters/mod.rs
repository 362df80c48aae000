//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter         | Implements  | Connects to                    |
//! |-----------------|-------------|--------------------------------|
//! | `clock`         | Clock       | `std::time` / `thread::sleep`  |
//! | `gpio`          | LineBinder  | Linux GPIO cdev or `SimPin`s   |
//! | `log_sink`      | EventSink   | `log` facade                   |
//! | `tcp_transport` | (I/O task)  | `std::net` TCP listener        |

pub mod clock;
pub mod gpio;
pub mod log_sink;
pub mod tcp_transport;
