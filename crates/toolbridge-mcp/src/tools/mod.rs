//! Built-in tools.

pub mod echo;
pub mod math;
pub mod sleep;

use toolbridge::{AdapterBuilder, AdapterResult};

pub fn register_all(builder: &mut AdapterBuilder) -> AdapterResult<()> {
    echo::register(builder)?;
    math::register(builder)?;
    sleep::register(builder)?;
    Ok(())
}
