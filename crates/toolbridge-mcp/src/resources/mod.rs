//! Built-in resources.

pub mod server_info;
pub mod tool_index;

use toolbridge::{AdapterBuilder, AdapterResult};

pub fn register_all(builder: &mut AdapterBuilder) -> AdapterResult<()> {
    server_info::register(builder)?;
    tool_index::register(builder)?;
    Ok(())
}
