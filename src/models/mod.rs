pub mod digest;
pub mod enums;
pub mod paper;
pub mod summary;

pub use digest::*;
pub use enums::*;
pub use paper::*;
pub use summary::*;
