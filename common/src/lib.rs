//! ATM Ledger Common Types
//!
//! Shared types used by the ledger engine, the HTTP server and the simulator:
//! account identifiers, the quantized money type and the error taxonomy.

pub mod identifiers;
pub mod monetary;
pub mod error;

pub use identifiers::*;
pub use monetary::*;
pub use error::*;
