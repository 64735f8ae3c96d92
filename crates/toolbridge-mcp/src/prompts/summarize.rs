//! Prompt `summarize`: request a summary of supplied text.

use anyhow::anyhow;
use serde_json::Value;
use toolbridge::{
    prompt_fn, AdapterBuilder, AdapterResult, PromptArgument, PromptArguments, RequestContext,
};

pub const NAME: &str = "summarize";

pub fn register(builder: &mut AdapterBuilder) -> AdapterResult<()> {
    builder.register_prompt_with_arguments(
        NAME,
        "Summarize a piece of text",
        vec![PromptArgument::required("text", "Text to summarize")],
        prompt_fn(expand),
    )
}

async fn expand(_ctx: RequestContext, args: PromptArguments) -> anyhow::Result<String> {
    let text = args
        .get("text")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("argument 'text' is required"))?;

    Ok(format!(
        "Summarize the following text in a few bullet points:\n\n{text}"
    ))
}
