//! Token pair lifecycle.
//!
//! - [`jwt`] -- HS512 access-token signing and validation.
//! - [`hasher`] -- Argon2id hashing of refresh secrets.
//! - [`material`] -- random session ids and refresh secrets.
//! - [`service`] -- issuance and single-use rotation.

pub mod hasher;
pub mod jwt;
pub mod material;
pub mod service;
