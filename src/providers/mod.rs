pub mod factory;
pub mod gemini;
pub mod traits;
pub mod utils;

pub use factory::GeminiFactory;
pub use gemini::gemini::GeminiProvider;
pub use traits::{CompletionProvider, ProviderFactory};
