//! Built-in prompts.

pub mod greeting;
pub mod summarize;

use toolbridge::{AdapterBuilder, AdapterResult};

pub fn register_all(builder: &mut AdapterBuilder) -> AdapterResult<()> {
    greeting::register(builder)?;
    summarize::register(builder)?;
    Ok(())
}
