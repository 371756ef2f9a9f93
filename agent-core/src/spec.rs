//! Tool specs, type specs, and the `Codec` contract (spec.md §3, §4.1).

use crate::identifier::Identifier;
use crate::route::AgentRoute;

/// Pure total encode/decode pair for a tool's payload, result, or sidecar
/// shape. Both directions must round-trip: `decode(encode(v)) == v` up to
/// canonical JSON equality (spec.md §8 invariant 1).
pub trait Codec: Send + Sync {
    /// The in-memory type this codec encodes and decodes.
    type Value;

    /// Encode a value to canonical JSON bytes.
    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>, CodecError>;

    /// Decode canonical JSON bytes back into a value.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Value, CodecError>;
}

/// A codec failed to encode or decode a value.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CodecError {
    /// The bytes did not parse, or did not match the schema.
    #[error("decode failed for `{type_name}`: {reason}")]
    Decode {
        /// The `TypeSpec::name` being decoded.
        type_name: String,
        /// Human-readable reason.
        reason: String,
    },
    /// The in-memory value could not be serialised.
    #[error("encode failed for `{type_name}`: {reason}")]
    Encode {
        /// The `TypeSpec::name` being encoded.
        type_name: String,
        /// Human-readable reason.
        reason: String,
    },
}

/// A named, schema-carrying type used for a tool's payload, result, or
/// sidecar shape. `schema` holds the raw JSON Schema bytes; `codec_name`
/// identifies (by convention, not enforcement) which [`Codec`] impl a
/// caller should look up to encode/decode values of this type — the
/// registry stores specs independently of any particular Rust type, so
/// the codec itself is resolved by the caller rather than carried inline.
#[derive(Debug, Clone)]
pub struct TypeSpec {
    /// Name of the type, e.g. `"EchoPayload"`.
    pub name: String,
    /// Raw JSON Schema document bytes describing this type.
    pub schema: Vec<u8>,
    /// Name of the codec that encodes/decodes values of this type.
    pub codec_name: String,
}

/// Immutable, process-scoped description of a single tool. Specs are
/// registered once into a [`crate::registry`]-style owner and never
/// mutated afterward.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    /// The tool's dotted identifier.
    pub name: Identifier,
    /// The toolset this tool belongs to (`service.toolset` prefix of `name`).
    pub toolset: String,
    /// Shape of the tool's input payload.
    pub payload: TypeSpec,
    /// Shape of the tool's result.
    pub result: TypeSpec,
    /// Shape of an optional sidecar artifact, never sent to model providers.
    pub sidecar: Option<TypeSpec>,
    /// Human-readable description presented to planners.
    pub description: String,
    /// Free-form tags used for allow-list filtering.
    pub tags: Vec<String>,
    /// Whether results from this tool carry `returned/truncated/total/refinement_hint`.
    pub bounded_result: bool,
    /// Whether this tool is implemented by invoking another agent inline.
    pub is_agent_tool: bool,
    /// Present when `is_agent_tool` is true: where to route the nested invocation.
    pub agent_route: Option<AgentRoute>,
}

impl ToolSpec {
    /// True if this spec advertises a tag in `tags`.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// The [`Codec`] named `"json"` by convention in [`TypeSpec::codec_name`]:
/// encodes and decodes any `Serialize + DeserializeOwned` value through
/// `serde_json`.
pub struct JsonCodec<T> {
    type_name: String,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    /// Build a codec that reports `type_name` in its error messages.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), _marker: std::marker::PhantomData }
    }
}

impl<T: serde::Serialize + serde::de::DeserializeOwned> Codec for JsonCodec<T> {
    type Value = T;

    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|err| CodecError::Encode { type_name: self.type_name.clone(), reason: err.to_string() })
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(bytes).map_err(|err| CodecError::Decode { type_name: self.type_name.clone(), reason: err.to_string() })
    }
}
