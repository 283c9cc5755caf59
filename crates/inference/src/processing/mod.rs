pub mod post;
pub mod pre;
pub mod resize;
