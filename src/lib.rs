#![doc = include_str!("../README.md")]

pub mod equiv;
pub mod int;
pub mod map;
mod raw;
pub mod set;
pub mod string;
pub mod sync;

pub use equiv::EquivMap;
pub use int::IntMap;
pub use map::PtrMap;
pub use set::PtrSet;
pub use string::StrMap;
pub use sync::SyncMap;
