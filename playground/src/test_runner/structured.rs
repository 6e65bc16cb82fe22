//! `unittest` convention: the whole suite runs as one batch through the
//! framework's own runner and the harness maps its result lists to rows.

use async_trait::async_trait;

use super::{decode_handles, BatchContext, BatchError, TestStrategy};
use crate::protocol::{Convention, TestHandle, TestRunSummary};

pub const NO_STRUCTURED_TESTS_MESSAGE: &str = "No unittest test cases found";

pub struct StructuredStrategy;

#[async_trait]
impl TestStrategy for StructuredStrategy {
    fn convention(&self) -> Convention {
        Convention::Structured
    }

    fn empty_message(&self) -> &'static str {
        NO_STRUCTURED_TESTS_MESSAGE
    }

    async fn define(&self, ctx: &mut BatchContext<'_>, source: &str) -> Result<(), BatchError> {
        ctx.execute_checked("_pg_hold_unittest_main()").await?;
        // A timeout restarts the session, leaving nothing to release
        let result = ctx.execute(source).await?;
        ctx.execute_checked("_pg_release_unittest_main()").await?;

        if !result.success {
            return Err(BatchError::Execution(result.error_text().to_string()));
        }
        Ok(())
    }

    async fn discover(&self, ctx: &mut BatchContext<'_>) -> Result<Vec<TestHandle>, BatchError> {
        let raw = ctx.evaluate("_pg_discover_structured()").await?;
        decode_handles(&raw)
    }

    async fn execute(
        &self,
        ctx: &mut BatchContext<'_>,
        handles: &[TestHandle],
    ) -> Result<TestRunSummary, BatchError> {
        let raw = ctx.evaluate("_pg_run_structured()").await?;
        let summary = TestRunSummary::decode(&raw).map_err(BatchError::Decode)?;

        if summary.total != handles.len() {
            return Err(BatchError::Decode(format!(
                "Could not parse test results: discovered {} tests but {} were reported",
                handles.len(),
                summary.total
            )));
        }
        Ok(summary)
    }
}
