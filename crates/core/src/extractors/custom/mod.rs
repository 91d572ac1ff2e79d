//! Built-in site extractors.

mod arstechnica;
mod generic;
mod semafor;
mod theverge;

use crate::extractors::registry::RegistryBuilder;

pub use generic::generic_rules;

/// Registers every built-in site extractor on `builder`.
pub fn register_all(builder: &mut RegistryBuilder) {
    builder
        .register(theverge::rules())
        .register(arstechnica::rules())
        .register(semafor::rules());
}
