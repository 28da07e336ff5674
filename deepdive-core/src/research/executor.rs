//! Task executors: resolve one problem into evidence and a summary.

use super::parsing::{PlannedQuery, parse_research_plan};
use super::problem::{Problem, TaskResult};
use super::prompts;
use crate::error::TaskError;
use crate::oracle::ReasoningOracle;
use crate::tools::ToolRegistry;
use crate::types::OracleCall;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Resolves a single problem. Errors become `Failed` task results at the dispatcher.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, problem: &Problem) -> Result<TaskResult, TaskError>;
}

/// Plans tool queries with the oracle, runs them, and summarizes the evidence.
pub struct ResearchTaskExecutor {
    oracle: Arc<ReasoningOracle>,
    tools: Arc<ToolRegistry>,
}

impl ResearchTaskExecutor {
    pub fn new(oracle: Arc<ReasoningOracle>, tools: Arc<ToolRegistry>) -> Self {
        Self { oracle, tools }
    }

    /// Queries to run for a problem. Without a usable plan every tool gets the
    /// problem text verbatim.
    async fn plan(&self, problem: &Problem) -> Result<Vec<PlannedQuery>, TaskError> {
        if self.tools.is_empty() {
            return Ok(Vec::new());
        }
        let response = self
            .oracle
            .ask(
                OracleCall::PlanResearch,
                &prompts::plan_research(&problem.text, &self.tools.describe()),
            )
            .await?;
        Ok(parse_research_plan(&response).unwrap_or_else(|| {
            debug!(
                problem_index = problem.index,
                "No usable research plan, querying every tool"
            );
            self.tools
                .list_names()
                .into_iter()
                .map(|tool| PlannedQuery {
                    tool,
                    query: problem.text.clone(),
                })
                .collect()
        }))
    }
}

#[async_trait]
impl TaskExecutor for ResearchTaskExecutor {
    async fn execute(&self, problem: &Problem) -> Result<TaskResult, TaskError> {
        let queries = self.plan(problem).await?;

        let mut evidence = Vec::with_capacity(queries.len());
        for planned in &queries {
            evidence.push(self.tools.invoke(&planned.tool, &planned.query).await);
        }
        debug!(
            problem_index = problem.index,
            invocations = evidence.len(),
            succeeded = evidence.iter().filter(|e| e.success).count(),
            "Evidence gathered"
        );

        let summary = self
            .oracle
            .ask(
                OracleCall::SummarizeResearch,
                &prompts::summarize_research(&problem.text, &evidence),
            )
            .await?;

        Ok(TaskResult::success(problem, evidence, summary.trim()))
    }
}
