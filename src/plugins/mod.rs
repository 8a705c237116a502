//! Bundled state action plugins
pub mod boolean_field;
pub mod counter;
pub mod numeric_field;

use crate::{error::Result, registry::StateActionRegistry};

pub use boolean_field::BooleanField;
pub use counter::Counter;
pub use numeric_field::NumericField;

pub fn register_defaults(registry: &mut StateActionRegistry) -> Result<()> {
    registry.register(boolean_field::definition(), Box::new(BooleanField::create))?;
    registry.register(numeric_field::definition(), Box::new(NumericField::create))?;
    registry.register(counter::definition(), Box::new(Counter::create))?;
    Ok(())
}
