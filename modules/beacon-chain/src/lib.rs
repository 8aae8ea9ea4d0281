//! Turns declarative chain specifications into bus wiring while enforcing
//! loop-free composition (component C2).

mod compiler;
mod error;

pub use compiler::{compile_chain, CompiledChain};
pub use error::ChainCompileError;
