pub mod canvas;
pub mod skeleton;
#[cfg(feature = "viewer")]
pub mod window;

pub use canvas::Canvas;
pub use skeleton::SKELETON_CONNECTIONS;
#[cfg(feature = "viewer")]
pub use minifb::Key;
#[cfg(feature = "viewer")]
pub use window::MinifbRenderer;
