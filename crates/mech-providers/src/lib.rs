//! LLM provider adapters: the [`traits::LlmProvider`] contract, a registry
//! that wires up configured providers, the concrete OpenAI-compatible
//! adapter, and the model-selection/fallback policy consumed by the
//! Streaming Runner in `mech-core`.

pub mod fallback;
pub mod openai_compat;
pub mod registry;
pub mod traits;
pub(crate) mod sse;
pub(crate) mod util;

pub use fallback::{pick_fallback, select_model, FallbackReason};
pub use registry::{ProviderInitError, ProviderRegistry};
pub use traits::{ChatRequest, ChatResponse, LlmProvider};
