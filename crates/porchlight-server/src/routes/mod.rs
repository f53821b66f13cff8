pub mod health;
pub mod manage;
pub mod stats;
pub mod track;
pub mod visitors;
