//! Python Sandbox - Persistent Python execution via RustPython
//!
//! This crate provides the embedded Python runtime behind the playground:
//! - Uses RustPython for embedded Python execution
//! - Keeps one global namespace alive across executions (the session)
//! - Captures stdout/stderr into host-side buffers
//! - Returns the value of a trailing expression statement
//! - Resets user bindings while keeping an allow-list of system names

pub mod protocol;
pub mod sandbox;
pub mod session;

pub use protocol::{ExecutionResult, SessionConfig};
pub use session::PythonSession;

/// Execute Python code in a fresh, throwaway session
pub fn execute_once(source: &str) -> ExecutionResult {
    match PythonSession::new(SessionConfig::default()) {
        Ok(session) => session.execute(source),
        Err(e) => ExecutionResult::failed(String::new(), e),
    }
}
