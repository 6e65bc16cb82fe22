//! Persistent interpreter session
//!
//! A `PythonSession` keeps one interpreter and one global namespace alive
//! across executions, so bindings made by one run are visible to the next
//! until `reset()` is called.

use rustpython_compiler::Mode;
use rustpython_vm::scope::Scope;
use rustpython_vm::{Interpreter, VirtualMachine};
use std::time::Instant;
use tracing::{debug, info};

use crate::protocol::{ExecutionResult, SessionConfig};
use crate::sandbox::{
    create_session_interpreter, format_exception, merged_output, reset_output_buffers,
    reset_program, split_trailing_expression, value_to_result, SESSION_SETUP_CODE,
};

/// Filename reported in tracebacks for user source
pub const SOURCE_FILENAME: &str = "<playground>";

/// One long-lived Python interpreter and its global namespace.
///
/// Not `Send`: create and use it on a single thread.
pub struct PythonSession {
    interpreter: Interpreter,
    scope: Scope,
    config: SessionConfig,
}

impl PythonSession {
    /// Create the interpreter and run the session prelude
    pub fn new(config: SessionConfig) -> Result<Self, String> {
        reset_output_buffers();
        let interpreter = create_session_interpreter();

        let scope = interpreter.enter(|vm| {
            let scope = vm.new_scope_with_builtins();
            run_exec(vm, &scope, SESSION_SETUP_CODE, "<session_setup>")
                .map_err(|e| format!("Session setup failed: {}", e))?;
            Ok::<_, String>(scope)
        })?;

        reset_output_buffers();
        info!(preserved = ?config.preserved_bindings, "python session ready");

        Ok(Self {
            interpreter,
            scope,
            config,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Execute source in the session namespace.
    ///
    /// A trailing expression statement is evaluated separately and its value
    /// becomes `result`.
    pub fn execute(&self, source: &str) -> ExecutionResult {
        reset_output_buffers();
        let start_time = Instant::now();
        let split = split_trailing_expression(source);

        let result = self.interpreter.enter(|vm| {
            if let Err(error) = run_exec(vm, &self.scope, split.body, SOURCE_FILENAME) {
                return ExecutionResult::failed(merged_output(), error);
            }

            let Some(tail) = split.tail else {
                return ExecutionResult::completed(merged_output(), None);
            };

            match run_eval(vm, &self.scope, tail) {
                Ok(value) => ExecutionResult::completed(merged_output(), value),
                Err(error) => ExecutionResult::failed(merged_output(), error),
            }
        });

        let duration_ms = start_time.elapsed().as_millis() as u64;
        debug!(
            success = result.success,
            duration_ms,
            output_len = result.output.len(),
            "session execute finished"
        );
        result.with_duration_ms(duration_ms)
    }

    /// Drop user bindings, keeping `_`-prefixed names and the allow-list
    pub fn reset(&self) -> Result<(), String> {
        let program = reset_program(&self.config.preserved_bindings);
        let outcome = self
            .interpreter
            .enter(|vm| run_exec(vm, &self.scope, &program, "<session_reset>"));
        reset_output_buffers();
        outcome.map_err(|e| format!("Session reset failed: {}", e))?;
        info!("python session reset");
        Ok(())
    }
}

fn run_exec(vm: &VirtualMachine, scope: &Scope, source: &str, filename: &str) -> Result<(), String> {
    let code = vm
        .compile(source, Mode::Exec, filename.to_string())
        .map_err(|e| format!("SyntaxError: {}", e))?;
    vm.run_code_obj(code, scope.clone())
        .map(|_| ())
        .map_err(|exc| format_exception(vm, &exc))
}

fn run_eval(vm: &VirtualMachine, scope: &Scope, expression: &str) -> Result<Option<String>, String> {
    let code = vm
        .compile(expression, Mode::Eval, SOURCE_FILENAME.to_string())
        .map_err(|e| format!("SyntaxError: {}", e))?;
    let value = vm
        .run_code_obj(code, scope.clone())
        .map_err(|exc| format_exception(vm, &exc))?;
    value_to_result(&value, vm).map_err(|exc| format_exception(vm, &exc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> PythonSession {
        PythonSession::new(SessionConfig::default()).expect("session should start")
    }

    #[test]
    fn test_print_is_captured() {
        let session = session();
        let result = session.execute("x = 2 + 3\nprint(x * 4)");
        assert!(result.success, "{:?}", result.error);
        assert!(result.output.contains("20"));
        assert!(result.result.is_none());
    }

    #[test]
    fn test_trailing_expression_is_result() {
        let session = session();
        let result = session.execute("values = [1, 2, 3]\nsum(values)");
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.result.as_deref(), Some("6"));

        let text = session.execute("'hello ' + 'world'");
        assert_eq!(text.result.as_deref(), Some("hello world"));

        let listing = session.execute("[1, 'a']");
        assert_eq!(listing.result.as_deref(), Some("[1, 'a']"));
    }

    #[test]
    fn test_state_persists_between_executions() {
        let session = session();
        assert!(session.execute("counter = 41").success);
        let result = session.execute("counter += 1\ncounter");
        assert_eq!(result.result.as_deref(), Some("42"));
    }

    #[test]
    fn test_exception_reports_traceback() {
        let session = session();
        let result = session.execute("print('before')\n1 / 0");
        assert!(!result.success);
        assert!(result.output.contains("before"));
        assert!(result.error_text().contains("ZeroDivisionError"));
    }

    #[test]
    fn test_syntax_error_fails() {
        let session = session();
        let result = session.execute("def broken(:\n    pass");
        assert!(!result.success);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_stderr_is_captured() {
        let session = session();
        let result = session.execute("import sys\nsys.stderr.write('warn\\n')\nprint('out')");
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.output, "out\nwarn\n");
    }

    #[test]
    fn test_reset_clears_user_bindings() {
        let session = session();
        assert!(session.execute("x = 1\n_hidden = 2").success);
        session.reset().expect("reset should succeed");

        let missing = session.execute("x");
        assert!(!missing.success);
        assert!(missing.error_text().contains("NameError"));

        let hidden = session.execute("_hidden");
        assert_eq!(hidden.result.as_deref(), Some("2"));

        let sys_kept = session.execute("sys.version_info[0]");
        assert_eq!(sys_kept.result.as_deref(), Some("3"));
    }

    #[test]
    fn test_output_capture_survives_reset() {
        let session = session();
        session.reset().expect("reset should succeed");
        let result = session.execute("print('still captured')");
        assert!(result.output.contains("still captured"));
    }

    #[test]
    fn test_input_is_removed() {
        let session = session();
        let result = session.execute("input('name? ')");
        assert!(!result.success);
        assert!(result.error_text().contains("NameError"));
    }
}
