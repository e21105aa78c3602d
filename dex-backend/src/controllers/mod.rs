pub mod events;
pub mod health;
pub mod positions;
pub mod security;
pub mod trades;
pub mod transactions;
pub mod vault;
pub mod wallet;
