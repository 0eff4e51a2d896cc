pub mod consistency;
pub mod document;
pub mod generator;
pub mod grammar;
pub mod ledger;
pub mod normalize;
pub mod packager;
pub mod pipeline;
pub mod runs;
