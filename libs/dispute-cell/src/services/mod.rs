pub mod disputes;
pub mod reviews;
pub mod store;

pub use disputes::DisputeService;
pub use reviews::ReviewService;
pub use store::{DisputeStore, ReviewStore, SupabaseDisputeStore, SupabaseReviewStore};
