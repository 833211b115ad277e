pub mod classifying;
pub mod running;
