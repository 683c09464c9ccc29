pub mod config;
pub mod device;
pub mod fusion;
pub mod garment;
pub mod logging;
pub mod pose;
pub mod projection;
pub mod render;
pub mod tracker;
