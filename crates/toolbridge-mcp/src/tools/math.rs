//! Tool `math`: basic arithmetic on two operands.

use anyhow::bail;
use serde::Deserialize;
use serde_json::json;
use toolbridge::{tool_fn, AdapterBuilder, AdapterResult, InputSchema, RequestContext};

pub const NAME: &str = "math";

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Deserialize)]
struct MathArgs {
    operation: Operation,
    a: f64,
    b: f64,
}

pub fn register(builder: &mut AdapterBuilder) -> AdapterResult<()> {
    builder.register_tool(
        NAME,
        "Add, subtract, multiply or divide two numbers",
        InputSchema::object()
            .property(
                "operation",
                json!({
                    "type": "string",
                    "enum": ["add", "subtract", "multiply", "divide"]
                }),
            )
            .property("a", json!({ "type": "number" }))
            .property("b", json!({ "type": "number" }))
            .require("operation")
            .require("a")
            .require("b"),
        tool_fn(execute),
    )
}

fn apply(op: Operation, a: f64, b: f64) -> anyhow::Result<f64> {
    Ok(match op {
        Operation::Add => a + b,
        Operation::Subtract => a - b,
        Operation::Multiply => a * b,
        Operation::Divide if b == 0.0 => bail!("division by zero"),
        Operation::Divide => a / b,
    })
}

async fn execute(_ctx: RequestContext, raw: Vec<u8>) -> anyhow::Result<Vec<String>> {
    let args: MathArgs = serde_json::from_slice(&raw)?;
    let value = apply(args.operation, args.a, args.b)?;
    Ok(vec![value.to_string()])
}
