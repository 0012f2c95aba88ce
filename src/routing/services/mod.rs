//! Routing services.

mod router;

pub use router::MessageRouter;
