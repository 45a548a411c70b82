//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods that
//! accept any PostgreSQL executor (a pool or an open transaction) as the
//! first argument.

pub mod session_repo;

pub use session_repo::SessionRepo;
