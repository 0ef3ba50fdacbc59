//! Infrastructure layer for the server application.
//!
//! Contains OS-facing adapters: listening sockets and file-system storage.
//!
//! **Dependency rule**: this layer may depend on `application` and `ttt_core`,
//! but MUST NOT be imported by the `application` layer.

pub mod network;
pub mod storage;
