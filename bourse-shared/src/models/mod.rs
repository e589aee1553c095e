pub mod events;
pub mod listing;
pub mod market;
pub mod rule;
