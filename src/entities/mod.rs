pub mod location;
pub mod lot;
pub mod product;
pub mod quantity;
pub mod stock_movement;
