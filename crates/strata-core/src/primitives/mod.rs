mod heap;
mod window;

pub use heap::{BoundedHeap, HeapOrder};
pub use window::Window;
