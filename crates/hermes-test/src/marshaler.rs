//! Marshalers that misbehave on purpose.

use hermes_core::{JsonGenerator, JsonParser, MarshalResult, Marshaler, Payload, TypeKey};
use std::any::Any;

/// Marshaler that panics halfway through every decode and encode.
///
/// Decoding reads the first value before panicking; encoding writes one value
/// before panicking. Used to check that streams are released on unwinding.
#[derive(Debug, Clone)]
pub struct PanickingMarshaler {
    key: TypeKey,
}

impl PanickingMarshaler {
    /// Creates a panicking marshaler bound to `key`.
    pub fn new(key: impl Into<TypeKey>) -> Self {
        Self { key: key.into() }
    }
}

impl Marshaler for PanickingMarshaler {
    fn type_key(&self) -> &TypeKey {
        &self.key
    }

    fn unmarshal_instance(&self, parser: &mut JsonParser<'_>) -> MarshalResult<Payload> {
        let _partial = parser.read_tree()?;
        panic!("marshaler for '{}' panicked mid-decode", self.key);
    }

    fn marshal_instance(&self, generator: &mut JsonGenerator<'_>, _value: &dyn Any) -> MarshalResult<()> {
        generator.write_value("partial")?;
        generator.flush()?;
        panic!("marshaler for '{}' panicked mid-encode", self.key);
    }
}
