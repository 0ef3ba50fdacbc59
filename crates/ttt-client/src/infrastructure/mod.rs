//! Infrastructure layer for the client application.
//!
//! Contains OS-facing adapters: the terminal, outbound sockets and
//! file-system storage.
//!
//! **Dependency rule**: this layer may depend on `application` and `ttt_core`,
//! but MUST NOT be imported by the `application` layer outside of tests.

pub mod console;
pub mod network;
pub mod storage;
