//! Node Communication Module
//!
//! Everything between "this command must run on node N" and the command
//! running there.
//!
//! ## Core Concepts
//! - **Node**: a handle on a cluster member with a single `send` operation.
//!   Callers never know whether the member is this process or another one.
//! - **Processor**: what a node dispatches through. `LocalProcessor` feeds the
//!   local staged executor; `RemoteProcessor` encodes the command and goes
//!   through a `Transport`.
//! - **Transport**: bytes-in/bytes-out request/reply. `HttpTransport` talks to
//!   other processes; `LoopbackTransport` delivers to nodes in this process.
//!
//! ## Submodules
//! - **`node`**: `Node` and the `Processor` seam.
//! - **`local`** / **`remote`** / **`loopback`**: processors and transports.
//! - **`protocol`**: endpoint paths and wire encoding.
//! - **`handlers`**: axum handlers for the command, internal and admin endpoints.

pub mod handlers;
pub mod local;
pub mod loopback;
pub mod node;
pub mod protocol;
pub mod remote;
