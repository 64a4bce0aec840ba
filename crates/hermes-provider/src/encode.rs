//! Response body encoding.

use crate::error::{ProviderError, ProviderResult};
use crate::provider::MarshalingProvider;
use bytes::{BufMut, Bytes, BytesMut};
use hermes_core::{DeclaredType, JsonGenerator, Marshaled, TypeKey};
use hermes_telemetry::metrics::{record_payload, Direction};
use mime::Mime;
use std::any::Any;
use std::io::Write;
use std::time::Instant;

impl MarshalingProvider {
    /// Encodes `value` as one JSON value into `output`.
    ///
    /// The marshaler is chosen by the `declared` type, not by `actual`, so a
    /// variant is written the way its declared type agrees to. When `declared`
    /// is not a concrete type nothing is written and `Ok(())` is returned.
    ///
    /// `output` is flushed on a best-effort basis and dropped before this
    /// returns, including when the marshaler fails or panics.
    pub fn write_to<W: Write>(
        &self,
        value: &dyn Any,
        actual: &TypeKey,
        declared: &DeclaredType,
        media_type: &Mime,
        output: W,
    ) -> ProviderResult<()> {
        let span = tracing::debug_span!(
            "hermes.encode",
            type_key = %actual,
            declared_type = %declared,
            media_type = %media_type
        );
        let _enter = span.enter();

        let started = Instant::now();
        let Some(key) = declared.as_concrete() else {
            tracing::debug!("declared type is not concrete, response body omitted");
            record_payload(Direction::Encode, actual, "skipped", started.elapsed());
            return Ok(());
        };

        let result = self.encode(value, key, output);

        let outcome = match &result {
            Ok(()) => "ok",
            Err(e) => {
                tracing::debug!(error = %e, code = e.error_code(), "payload encode failed");
                e.outcome()
            }
        };
        record_payload(Direction::Encode, key, outcome, started.elapsed());
        result
    }

    /// Encodes a `T` declared as itself.
    pub fn write<T: Marshaled, W: Write>(
        &self,
        value: &T,
        media_type: &Mime,
        output: W,
    ) -> ProviderResult<()> {
        let key = TypeKey::of::<T>();
        let declared = DeclaredType::Concrete(key.clone());
        self.write_to(value, &key, &declared, media_type, output)
    }

    /// Encodes a `T` into a buffered body.
    pub fn write_bytes<T: Marshaled>(&self, value: &T, media_type: &Mime) -> ProviderResult<Bytes> {
        let mut body = BytesMut::new().writer();
        self.write(value, media_type, &mut body)?;
        Ok(body.into_inner().freeze())
    }

    fn encode<W: Write>(&self, value: &dyn Any, key: &TypeKey, mut output: W) -> ProviderResult<()> {
        let marshaler = self.cache.get_or_load(key)?;

        let mut generator = JsonGenerator::new(&mut output);
        marshaler
            .marshal_instance(&mut generator, value)
            .and_then(|()| generator.finish())
            .map_err(|e| ProviderError::encode_failed(key, e))
    }
}

#[cfg(test)]
mod tests {
    use crate::{MarshalingProvider, ProviderError};
    use hermes_config::{ProviderConfig, WarmupMode};
    use hermes_core::{DeclaredType, MarshalError, MarshalerRegistry, TypeKey};
    use hermes_test::fixtures::{sample_order, Order, Shape};
    use hermes_test::StreamProbe;

    fn provider() -> MarshalingProvider {
        MarshalingProvider::builder()
            .resolver(
                MarshalerRegistry::builder()
                    .register::<Order>()
                    .register::<Shape>()
                    .build(),
            )
            .config(ProviderConfig {
                warmup: WarmupMode::Disabled,
                ..Default::default()
            })
            .build()
    }

    #[test]
    fn test_write_typed() {
        let probe = StreamProbe::new();
        provider()
            .write(&Shape::Circle { radius: 0.5 }, &mime::APPLICATION_JSON, probe.writer())
            .unwrap();

        assert_eq!(probe.written_string(), r#"{"kind":"circle","radius":0.5}"#);
        assert_eq!(probe.drops(), 1);
    }

    #[test]
    fn test_write_bytes_is_compact() {
        let body = provider()
            .write_bytes(&sample_order(), &mime::APPLICATION_JSON)
            .unwrap();
        assert!(!body.contains(&b'\n'));

        let back: Order = serde_json::from_slice(&body).unwrap();
        assert_eq!(back, sample_order());
    }

    #[test]
    fn test_ambiguous_declared_type_writes_nothing() {
        let provider = provider();
        let shape = Shape::Circle { radius: 1.0 };

        for declared in [
            DeclaredType::parameterized("collections.List", vec![DeclaredType::variable("T")]),
            DeclaredType::variable("T"),
            DeclaredType::Wildcard,
        ] {
            let probe = StreamProbe::new();
            provider
                .write_to(&shape, &shape.variant_key(), &declared, &mime::APPLICATION_JSON, probe.writer())
                .unwrap();
            assert!(probe.written().is_empty());
            assert_eq!(probe.drops(), 1);
        }
        assert!(provider.cache().is_empty());
    }

    #[test]
    fn test_value_of_wrong_type_fails() {
        let probe = StreamProbe::new();
        let err = provider()
            .write_to(
                &sample_order(),
                &Order::key(),
                &DeclaredType::concrete(Shape::key()),
                &mime::APPLICATION_JSON,
                probe.writer(),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            ProviderError::EncodeFailed {
                source: MarshalError::TypeMismatch { .. },
                ..
            }
        ));
        assert!(!err.is_client_error());
        assert_eq!(probe.drops(), 1);
    }

    #[test]
    fn test_unknown_declared_type_is_codec_unavailable() {
        let probe = StreamProbe::new();
        let missing = TypeKey::new("orders.Missing");
        let err = provider()
            .write_to(
                &sample_order(),
                &Order::key(),
                &DeclaredType::concrete(missing),
                &mime::APPLICATION_JSON,
                probe.writer(),
            )
            .unwrap_err();

        assert_eq!(err.error_code(), "CODEC_UNAVAILABLE");
        assert!(probe.written().is_empty());
        assert_eq!(probe.drops(), 1);
    }

    #[test]
    fn test_broken_pipe_is_encode_failure() {
        let probe = StreamProbe::new();
        let err = provider()
            .write(&sample_order(), &mime::APPLICATION_JSON, probe.writer().failing_after(4))
            .unwrap_err();

        assert_eq!(err.error_code(), "ENCODE_FAILED");
        assert_eq!(probe.written().len(), 4);
        assert_eq!(probe.drops(), 1);
    }
}
