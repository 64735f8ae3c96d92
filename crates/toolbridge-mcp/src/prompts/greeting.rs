//! Prompt `greeting`: ask for a greeting addressed to someone.

use anyhow::anyhow;
use serde_json::Value;
use toolbridge::{
    prompt_fn, AdapterBuilder, AdapterResult, PromptArgument, PromptArguments, RequestContext,
};

pub const NAME: &str = "greeting";

pub fn register(builder: &mut AdapterBuilder) -> AdapterResult<()> {
    builder.register_prompt_with_arguments(
        NAME,
        "Compose a greeting for someone",
        vec![
            PromptArgument::required("name", "Who to greet"),
            PromptArgument::optional("style", "Tone of the greeting, e.g. formal or casual"),
        ],
        prompt_fn(expand),
    )
}

async fn expand(_ctx: RequestContext, args: PromptArguments) -> anyhow::Result<String> {
    let name = args
        .get("name")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| anyhow!("argument 'name' is required"))?;
    let style = args
        .get("style")
        .and_then(Value::as_str)
        .unwrap_or("friendly");

    Ok(format!(
        "Write a short, {style} greeting addressed to {name}. \
         Keep it to one or two sentences."
    ))
}
