//! Recap Engine — fact-locked game recaps from play-by-play feeds.
//!
//! Turns a noisy play-by-play feed into a verified scoring ledger, checks it
//! against the official final score, and hands a fact block to a narrative
//! generator whose output is rejected if it contradicts the ledger.

pub mod config;
pub mod core;
pub mod publish;
pub mod schema;
pub mod source;
