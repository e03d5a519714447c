// Adapters layer: concrete implementations of the domain ports.

pub mod triton;

pub use triton::TritonDispatcher;
