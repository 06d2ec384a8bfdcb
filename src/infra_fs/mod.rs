mod session_cache_file;
mod session_cache_memory;

pub use session_cache_file::*;
pub use session_cache_memory::*;
