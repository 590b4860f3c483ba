//! 编排图：固定拓扑的状态机
//!
//! ```text
//! fetch_data → preprocess → run_models → decide ─┬─ continue → fetch_data
//!                                                └─ end → analyze_results → finalize
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::GraphConfig;
use crate::generator::context::OrchestratorContext;
use crate::generator::events::Event;
use crate::generator::node::{NodeStatus, RetryingNode};
use crate::generator::nodes::{
    AnalyzeResultsNode, FetchDataNode, FinalizeNode, PreprocessNode, RunModelsNode,
};
use crate::generator::state::RunState;

/// 图中的步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphStep {
    FetchData,
    Preprocess,
    RunModels,
    Decide,
    AnalyzeResults,
    Finalize,
}

impl GraphStep {
    pub fn name(&self) -> &'static str {
        match self {
            GraphStep::FetchData => "fetch_data",
            GraphStep::Preprocess => "preprocess",
            GraphStep::RunModels => "run_models",
            GraphStep::Decide => "decide",
            GraphStep::AnalyzeResults => "analyze_results",
            GraphStep::Finalize => "finalize",
        }
    }
}

/// 循环结束的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// 已得到可执行建议
    Recommendation,
    /// 没有可处理的区域
    NoZones,
    /// 本轮有节点耗尽重试，再次循环只会重复同样的失败
    Degraded,
    /// 达到最大循环轮数
    IterationLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Terminate(TerminationReason),
}

/// 决策节点的转移函数
///
/// `exhausted` 表示本轮是否有节点耗尽了重试；重试后恢复的失败不计入。
pub fn decide(state: &RunState, iteration: u32, max_iterations: u32, exhausted: bool) -> Decision {
    if state.has_recommendation() {
        Decision::Terminate(TerminationReason::Recommendation)
    } else if state.zones.is_empty() {
        Decision::Terminate(TerminationReason::NoZones)
    } else if exhausted {
        Decision::Terminate(TerminationReason::Degraded)
    } else if iteration >= max_iterations {
        Decision::Terminate(TerminationReason::IterationLimit)
    } else {
        Decision::Continue
    }
}

/// 一次图执行的结果
#[derive(Debug, Clone)]
pub struct GraphOutcome {
    pub state: RunState,
    pub iterations: u32,
    pub termination: TerminationReason,
}

/// 编排图
pub struct OrchestrationGraph {
    fetch_data: RetryingNode,
    preprocess: RetryingNode,
    run_models: RetryingNode,
    analyze_results: RetryingNode,
    finalize: RetryingNode,
    max_iterations: u32,
}

impl OrchestrationGraph {
    pub fn new(config: &GraphConfig) -> Self {
        Self {
            fetch_data: RetryingNode::new(Arc::new(FetchDataNode), config.fetch_data),
            preprocess: RetryingNode::new(Arc::new(PreprocessNode), config.preprocess),
            run_models: RetryingNode::new(Arc::new(RunModelsNode), config.run_models),
            analyze_results: RetryingNode::new(
                Arc::new(AnalyzeResultsNode),
                config.analyze_results,
            ),
            finalize: RetryingNode::new(Arc::new(FinalizeNode), config.finalize),
            max_iterations: config.max_iterations.max(1),
        }
    }

    /// 从 fetch_data 开始执行直到 finalize；每个步骤执行前发出 `step` 事件
    pub async fn run(&self, state: RunState, ctx: &OrchestratorContext) -> GraphOutcome {
        let mut state = state;
        let mut step = GraphStep::FetchData;
        let mut iteration = 1;
        let mut exhausted = false;
        let mut termination = TerminationReason::IterationLimit;

        loop {
            ctx.events.emit(Event::step(step.name(), iteration)).await;
            info!(node = step.name(), iteration, "entering step");

            let next = match step {
                GraphStep::FetchData => {
                    let (next, status) = self.fetch_data.execute(state, ctx).await;
                    state = next;
                    exhausted |= status == NodeStatus::Exhausted;
                    Some(GraphStep::Preprocess)
                }
                GraphStep::Preprocess => {
                    let (next, status) = self.preprocess.execute(state, ctx).await;
                    state = next;
                    exhausted |= status == NodeStatus::Exhausted;
                    Some(GraphStep::RunModels)
                }
                GraphStep::RunModels => {
                    let (next, status) = self.run_models.execute(state, ctx).await;
                    state = next;
                    exhausted |= status == NodeStatus::Exhausted;
                    Some(GraphStep::Decide)
                }
                GraphStep::Decide => {
                    match decide(&state, iteration, self.max_iterations, exhausted) {
                        Decision::Continue => {
                            iteration += 1;
                            exhausted = false;
                            Some(GraphStep::FetchData)
                        }
                        Decision::Terminate(reason) => {
                            info!(?reason, iteration, "loop finished");
                            termination = reason;
                            Some(GraphStep::AnalyzeResults)
                        }
                    }
                }
                GraphStep::AnalyzeResults => {
                    state = self.analyze_results.execute(state, ctx).await.0;
                    Some(GraphStep::Finalize)
                }
                GraphStep::Finalize => {
                    state = self.finalize.execute(state, ctx).await.0;
                    None
                }
            };

            match next {
                Some(next) => step = next,
                None => break,
            }
        }

        GraphOutcome {
            state,
            iterations: iteration,
            termination,
        }
    }
}
