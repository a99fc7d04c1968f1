pub mod cancellation;
pub mod display;
pub mod store;

pub use cancellation::CancellationService;
pub use store::{CancellationStore, InMemoryCancellationStore, SupabaseCancellationStore};
