pub mod event;
pub mod score;
pub mod team;
