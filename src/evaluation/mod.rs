pub mod fitness;
pub mod trajectory;
