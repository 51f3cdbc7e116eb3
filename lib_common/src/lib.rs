// Declare the modules to re-export
#[cfg(feature = "retrieve")]
pub mod retrieve;
#[cfg(feature = "stats")]
pub mod stats;

// Re-export the most commonly used types
#[cfg(feature = "retrieve")]
pub use retrieve::client::ApiClient;
#[cfg(feature = "retrieve")]
pub use retrieve::retry::{retry_request, transient_by_default, RetrieveError, RetryPolicy};
#[cfg(feature = "stats")]
pub use stats::top_tokens::get_top;
