//
// lib.rs
//
// Library root, shared by the binary, the integration tests and the benches
//

pub mod backend;
pub mod compilation;
pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod document_store;
pub mod file_handler;
pub mod path_resolve;
pub mod perf;
pub mod position;
pub mod resolver;
pub mod state;
pub mod stats;
pub mod syntax;
// test_utils is available in test builds and when the `test-support` feature is enabled.
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
