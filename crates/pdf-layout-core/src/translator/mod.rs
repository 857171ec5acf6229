mod openai;
mod retry;
mod traits;

pub use openai::OpenAiTranslator;
pub use retry::RetryPolicy;
pub use traits::{LengthConstraint, OcrEngine, OcrRegion, Translator, TranslatorInfo};

use crate::config::ProviderConfig;
use crate::error::Result;
use std::sync::Arc;

/// Create the provider client from configuration.
///
/// The returned client implements both [`Translator`] and [`OcrEngine`].
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<OpenAiTranslator>> {
    Ok(Arc::new(OpenAiTranslator::new(config)?))
}
