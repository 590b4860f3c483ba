use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{Map, Value, json};
use tracing::debug;

use super::ANALYZE_RESULTS;
use crate::error::OrchestratorResult;
use crate::generator::context::OrchestratorContext;
use crate::generator::events::Event;
use crate::generator::node::Node;
use crate::generator::state::{RunState, ZoneOutput};
use crate::i18n::TargetLanguage;

/// 调用语言模型，把模型输出综合为优先行动清单
pub struct AnalyzeResultsNode;

#[async_trait]
impl Node for AnalyzeResultsNode {
    fn name(&self) -> &'static str {
        ANALYZE_RESULTS
    }

    async fn run(&self, state: RunState, ctx: &OrchestratorContext) -> OrchestratorResult<RunState> {
        let question = build_question(
            &state.model_outputs,
            &state.context.filters,
            &state.context.objectives,
            ctx.config.graph.prioritized_actions,
            ctx.config.target_language,
        )?;
        debug!(chars = question.len(), "prompting language model");

        let summary = ctx.llm.invoke(&question).await?.into_text();
        ctx.events
            .emit(Event::partial(json!({
                "node": ANALYZE_RESULTS,
                "summary": summary,
            })))
            .await;

        Ok(state.with_summary(summary))
    }
}

/// 构建规划提示词
pub fn build_question(
    model_outputs: &IndexMap<String, ZoneOutput>,
    filters: &Map<String, Value>,
    objectives: &[String],
    actions: u32,
    language: TargetLanguage,
) -> OrchestratorResult<String> {
    let outputs = serde_json::to_string_pretty(model_outputs)?;
    let filters = serde_json::to_string_pretty(filters)?;
    let objectives = if objectives.is_empty() {
        "- (none given)".to_string()
    } else {
        objectives
            .iter()
            .map(|o| format!("- {}", o))
            .collect::<Vec<_>>()
            .join("\n")
    };

    Ok(format!(
        r#"## Model outputs per zone
```json
{outputs}
```

## Filters
```json
{filters}
```

## Objectives
{objectives}

## Task
Produce {actions} prioritized actions for the zones above, most urgent first.
For each action state:
1. the zone(s) it targets and the intervention itself;
2. the KPI that measures success, with a target value;
3. the main risk and how to mitigate it;
4. the time horizon (short, medium or long term).
Base every action on the model outputs; do not invent data that is not there.

{instruction}"#,
        instruction = language.prompt_instruction(),
    ))
}
