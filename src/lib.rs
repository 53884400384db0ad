//! # Eniri
//!
//! `eniri` is an HTTP service for credential verification and session
//! issuance. It stores a salted derived key per login (Argon2id), verifies
//! presented passwords in constant effort, and hands back a signed,
//! time-bounded session artifact carrying the subject's identity and role.
//!
//! Sessions are stateless: the cookie carries the signed claims themselves,
//! expiry is evaluated whenever the artifact is presented, and logout is an
//! instruction to the client to drop it.

pub mod api;
pub mod auth;
pub mod cli;
