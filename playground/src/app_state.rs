//! Shared application state for the command handlers.
//!
//! One `AppState` owns the settings in effect for this launch and, once
//! started, the single Python session that every runner talks to.

use std::sync::Arc;

use crate::actors::session_actor::SessionHandle;
use crate::backend::ExecutionBackend;
use crate::code_runner::CodeRunner;
use crate::error::BackendError;
use crate::settings::PlaygroundSettings;
use crate::test_runner::TestRunner;

pub struct AppState {
    pub settings: PlaygroundSettings,
    pub backend: Arc<dyn ExecutionBackend>,
    pub code_runner: CodeRunner,
    pub test_runner: TestRunner,
}

impl AppState {
    /// Start the Python session and wire the runners to it
    pub fn start(settings: PlaygroundSettings) -> Result<Self, BackendError> {
        let session = SessionHandle::start(settings.session_config())?;
        Ok(Self::with_backend(settings, Arc::new(session)))
    }

    pub fn with_backend(settings: PlaygroundSettings, backend: Arc<dyn ExecutionBackend>) -> Self {
        let code_runner = CodeRunner::new(backend.clone())
            .with_limits(settings.validation_limits())
            .with_timeout(settings.run_timeout())
            .with_max_output_chars(settings.max_output_chars);
        let test_runner = TestRunner::new(backend.clone())
            .with_limits(settings.validation_limits())
            .with_batch_timeout(settings.test_timeout());

        Self {
            settings,
            backend,
            code_runner,
            test_runner,
        }
    }
}
