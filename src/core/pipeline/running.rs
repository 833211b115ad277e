use std::sync::Arc;

use tokio::time::Instant;
use uuid::Uuid;

use crate::core::{
    domain::{EvaluationRequest, RunResult},
    pipeline::classifying::classify,
    traits::executor::Executor,
};

/// Evaluates one artifact per call. Every failure ends up in the returned
/// [`RunResult`]; nothing is retried.
#[derive(Clone, Debug)]
pub struct Runner {
    executor: Arc<dyn Executor>,
}

impl Runner {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self { executor }
    }

    #[tracing::instrument(
        skip(self, request),
        fields(
            run_id = %Uuid::new_v4(),
            artifact = %request.artifact_path.display(),
            frames = request.frame_budget,
            timeout_ms = request.timeout_ms,
        )
    )]
    pub async fn run(&self, request: EvaluationRequest) -> RunResult {
        let started = Instant::now();

        let execution = self.executor.execute(&request).await;
        let measured_ms = started.elapsed().as_secs_f64() * 1000.0;
        tracing::debug!("Execution result: {:?}", execution);

        let result = classify(execution).into_result(measured_ms);
        tracing::info!(
            ok = result.ok,
            crashed = result.crashed,
            elapsed_ms = result.elapsed_ms,
            errors = ?result.errors,
            "Run finished"
        );

        result
    }
}
