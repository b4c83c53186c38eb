mod index;
mod store;

pub use store::MemoryStore;
