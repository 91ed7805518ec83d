pub mod clip;
pub mod pack;
