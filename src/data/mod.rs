pub mod client;
pub mod news;
pub mod prices;
