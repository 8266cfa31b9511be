mod heap_file;
mod page_store;

pub use heap_file::*;
pub use page_store::*;
