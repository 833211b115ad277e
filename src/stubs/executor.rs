use std::time::Duration;

use crate::core::{
    domain::{EvaluationRequest, ProcessExit},
    traits::executor::{ExecError, Executor},
};

/// Returns a canned result after a fixed delay, without spawning anything.
#[derive(Debug, Clone)]
pub struct ExecutorStub {
    result: Result<ProcessExit, ExecError>,
    delay: Duration,
}

impl ExecutorStub {
    pub fn new(result: Result<ProcessExit, ExecError>, delay: Duration) -> Self {
        Self { result, delay }
    }
}

#[async_trait::async_trait]
impl Executor for ExecutorStub {
    #[tracing::instrument]
    async fn execute(&self, request: &EvaluationRequest) -> Result<ProcessExit, ExecError> {
        tracing::debug!("Start execution: request={:?}", request);
        tokio::time::sleep(self.delay).await;
        tracing::debug!("Execution result: {:?}", self.result);

        self.result.clone()
    }
}
