//! Request body decoding.

use crate::error::{ProviderError, ProviderResult};
use crate::provider::MarshalingProvider;
use bytes::{Buf, Bytes};
use hermes_core::{JsonParser, MarshalError, Marshaled, Payload, TypeKey};
use hermes_telemetry::metrics::{record_payload, Direction};
use mime::Mime;
use std::io::Read;
use std::time::Instant;

impl MarshalingProvider {
    /// Decodes one JSON value of type `key` from `input`.
    ///
    /// `input` is consumed and dropped before this returns, on success, on
    /// error and during unwinding alike. Read failures and parse failures are
    /// both reported as [`ProviderError::MalformedPayload`]. Content after the
    /// first value is not inspected.
    pub fn read_from<R: Read>(
        &self,
        key: &TypeKey,
        media_type: &Mime,
        input: R,
    ) -> ProviderResult<Payload> {
        let span = tracing::debug_span!("hermes.decode", type_key = %key, media_type = %media_type);
        let _enter = span.enter();

        let started = Instant::now();
        let result = self.decode(key, input);

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => {
                tracing::debug!(error = %e, code = e.error_code(), "payload decode failed");
                e.outcome()
            }
        };
        record_payload(Direction::Decode, key, outcome, started.elapsed());
        result
    }

    /// Decodes a `T` from `input`.
    pub fn read<T: Marshaled, R: Read>(&self, media_type: &Mime, input: R) -> ProviderResult<T> {
        let key = TypeKey::of::<T>();
        let payload = self.read_from(&key, media_type, input)?;
        payload
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| ProviderError::TypeMismatch { expected: key })
    }

    /// Decodes one JSON value of type `key` from a buffered body.
    pub fn read_bytes(&self, key: &TypeKey, media_type: &Mime, body: Bytes) -> ProviderResult<Payload> {
        self.read_from(key, media_type, body.reader())
    }

    fn decode<R: Read>(&self, key: &TypeKey, mut input: R) -> ProviderResult<Payload> {
        let marshaler = self.cache.get_or_load(key)?;

        let mut parser = JsonParser::new(&mut input);
        let malformed = |e: MarshalError| ProviderError::malformed(key, e);
        if parser.next_token().map_err(malformed)?.is_none() {
            return Err(malformed(MarshalError::UnexpectedEof));
        }

        marshaler.unmarshal_instance(&mut parser).map_err(malformed)
    }
}
