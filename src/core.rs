pub mod attempt;
pub mod date_range;
pub mod direction;
pub mod failure;
pub mod payload;
pub mod period;
pub mod readings;
pub mod request;
pub mod series;
