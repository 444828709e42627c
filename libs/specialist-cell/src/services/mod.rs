pub mod availability;
pub mod directory;

pub use availability::{AvailabilityService, AvailabilityStore, SupabaseAvailabilityStore};
pub use directory::{Directory, SpecialistRegistry, SpecialistService, SupabaseDirectory};
