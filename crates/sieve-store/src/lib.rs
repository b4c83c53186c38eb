mod error;
mod index;
mod record;
mod store;

pub use error::StoreError;
pub use index::{IndexCatalog, IndexDescriptor, IndexQuery, IndexType};
pub use record::Record;
pub use store::{RecordStore, RecordStream};

#[cfg(feature = "memory")]
mod memory;

#[cfg(feature = "memory")]
pub use memory::MemoryStore;
