//! RustPython VM configuration for the playground session
//!
//! This module creates the Python environment that:
//! - Loads the native and frozen standard library
//! - Routes `sys.stdout` / `sys.stderr` into host-side buffers
//! - Removes interactive builtins (input, breakpoint)
//! - Splits a trailing expression statement off user source

use rustpython_parser::{ast, Parse};
use rustpython_vm::builtins::{PyBaseExceptionRef, PyModule, PyStr};
use rustpython_vm::function::FuncArgs;
use rustpython_vm::{
    AsObject, Interpreter, PyObjectRef, PyPayload, PyRef, PyResult, Settings, VirtualMachine,
};
use std::cell::RefCell;

/// Name of the native module that receives captured output
pub const CAPTURE_MODULE: &str = "_playground_io";

// Thread-local capture buffers; a session lives on exactly one thread
thread_local! {
    static STDOUT_BUFFER: RefCell<String> = RefCell::new(String::new());
    static STDERR_BUFFER: RefCell<String> = RefCell::new(String::new());
}

/// Clear both capture buffers
pub fn reset_output_buffers() {
    STDOUT_BUFFER.with(|sb| sb.borrow_mut().clear());
    STDERR_BUFFER.with(|se| se.borrow_mut().clear());
}

/// Get the stdout buffer
pub fn get_stdout() -> String {
    STDOUT_BUFFER.with(|sb| sb.borrow().clone())
}

/// Get the stderr buffer
pub fn get_stderr() -> String {
    STDERR_BUFFER.with(|se| se.borrow().clone())
}

/// Captured stdout followed by captured stderr
pub fn merged_output() -> String {
    let mut output = get_stdout();
    output.push_str(&get_stderr());
    output
}

/// Append to stdout
pub fn append_stdout(s: &str) {
    STDOUT_BUFFER.with(|sb| sb.borrow_mut().push_str(s));
}

/// Append to stderr
pub fn append_stderr(s: &str) {
    STDERR_BUFFER.with(|se| se.borrow_mut().push_str(s));
}

/// Create the session interpreter with the full standard library available
pub fn create_session_interpreter() -> Interpreter {
    let mut settings = Settings::default();
    settings.isolated = true;
    settings.user_site_directory = false;
    settings.import_site = false;

    Interpreter::with_init(settings, |vm| {
        vm.add_native_modules(rustpython_stdlib::get_module_inits());
        vm.add_frozen(rustpython_pylib::FROZEN_STDLIB);
        vm.add_native_module(CAPTURE_MODULE.to_owned(), Box::new(make_capture_module));
    })
}

/// Create the capture native module
fn make_capture_module(vm: &VirtualMachine) -> PyRef<PyModule> {
    let module = PyModule::new();
    let module_ref = module.into_ref(&vm.ctx);
    let dict = module_ref.dict();

    let _ = dict.set_item(
        "write_stdout",
        vm.new_function("write_stdout", write_stdout_impl).into(),
        vm,
    );
    let _ = dict.set_item(
        "write_stderr",
        vm.new_function("write_stderr", write_stderr_impl).into(),
        vm,
    );

    module_ref
}

fn first_arg_text(args: &FuncArgs, vm: &VirtualMachine) -> PyResult<String> {
    let text = args
        .args
        .first()
        .ok_or_else(|| vm.new_type_error("write() requires a string".to_string()))?;
    Ok(text.str(vm)?.as_str().to_owned())
}

fn write_stdout_impl(args: FuncArgs, vm: &VirtualMachine) -> PyResult<()> {
    append_stdout(&first_arg_text(&args, vm)?);
    Ok(())
}

fn write_stderr_impl(args: FuncArgs, vm: &VirtualMachine) -> PyResult<()> {
    append_stderr(&first_arg_text(&args, vm)?);
    Ok(())
}

/// Prelude run once per session before any user code
pub const SESSION_SETUP_CODE: &str = r#"
__name__ = "__main__"

import sys
from _playground_io import write_stdout as _pg_write_stdout, write_stderr as _pg_write_stderr


class _OutputCapture:
    def __init__(self, sink):
        self._sink = sink

    def write(self, text):
        self._sink(text)
        return len(text)

    def flush(self):
        pass

    def isatty(self):
        return False


sys.stdout = _OutputCapture(_pg_write_stdout)
sys.stderr = _OutputCapture(_pg_write_stderr)

import builtins as _pg_builtins
for _pg_name in ("input", "breakpoint"):
    if hasattr(_pg_builtins, _pg_name):
        delattr(_pg_builtins, _pg_name)
del _pg_name, _pg_builtins, _pg_write_stdout, _pg_write_stderr
"#;

/// Build the program that clears user bindings from the session globals
pub fn reset_program(preserved: &[String]) -> String {
    let preserved_literal = serde_json::to_string(preserved).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"
_pg_preserved = set({preserved_literal})
for _pg_name in list(globals().keys()):
    if not _pg_name.startswith("_") and _pg_name not in _pg_preserved:
        del globals()[_pg_name]
del _pg_name, _pg_preserved
"#
    )
}

/// User source split into statements to execute and an optional trailing
/// expression whose value is the result of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSource<'a> {
    pub body: &'a str,
    pub tail: Option<&'a str>,
}

/// Split off the last top-level statement when it is a bare expression.
///
/// Sources that do not parse are returned whole so the compiler reports
/// the syntax error itself.
pub fn split_trailing_expression(source: &str) -> SplitSource<'_> {
    let whole = SplitSource {
        body: source,
        tail: None,
    };

    let suite = match ast::Suite::parse(source, "<playground>") {
        Ok(suite) => suite,
        Err(_) => return whole,
    };

    match suite.last() {
        Some(ast::Stmt::Expr(stmt)) => {
            let start = usize::from(stmt.range.start());
            let end = usize::from(stmt.range.end());
            match (source.get(..start), source.get(start..end)) {
                (Some(body), Some(tail)) => SplitSource {
                    body,
                    tail: Some(tail),
                },
                _ => whole,
            }
        }
        _ => whole,
    }
}

/// Render an exception with its traceback the way the interpreter prints it
pub fn format_exception(vm: &VirtualMachine, exc: &PyBaseExceptionRef) -> String {
    let mut text = String::new();
    if vm.write_exception(&mut text, exc).is_err() || text.is_empty() {
        return format!("{:?}", exc);
    }
    text.trim_end().to_string()
}

/// Serialize a trailing-expression value: `None` → no result, `str` → itself,
/// anything else → `repr()`.
pub fn value_to_result(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult<Option<String>> {
    if obj.is(&vm.ctx.none) {
        return Ok(None);
    }
    if let Some(s) = obj.downcast_ref::<PyStr>() {
        return Ok(Some(s.as_str().to_string()));
    }
    Ok(Some(obj.repr(vm)?.as_str().to_string()))
}
