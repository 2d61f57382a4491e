//! affipress text-generation infrastructure adapter.
//!
//! Implements the [`pipeline::DraftProducer`] trait over the Hugging Face
//! hosted inference API. Other providers are added as new types in this crate
//! without any changes to the `pipeline` crate.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, prompt formatting and response parsing
//! live here. The [`pipeline`] crate sees only [`pipeline::DraftProducer`];
//! any failure in this crate surfaces as
//! [`pipeline::PipelineError::ExternalServiceUnavailable`] so the caller can
//! fall back to the template producer.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`huggingface`] | [`HuggingFaceProducer`] |
//! | [`prompt`] | prompt construction and output splitting |
//! | [`error`] | [`LlmError`] |

pub mod error;
pub mod huggingface;
pub mod prompt;

pub use error::LlmError;
pub use huggingface::{HuggingFaceProducer, TOKEN_ENV};
