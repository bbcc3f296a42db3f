//! In-process stand-ins for the hosted backend.

mod documents;
mod identity;
mod objects;

pub use documents::{compare_values, MemoryDocumentStore};
pub use identity::MemoryIdentityProvider;
pub use objects::MemoryObjectStore;
