//! Integration tests against a real Python session.
//!
//! These tests start the embedded interpreter, so they are slower than the
//! unit tests next to each module.
