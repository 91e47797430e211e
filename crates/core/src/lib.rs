pub mod blurring;
pub mod detection;
pub mod media;
pub mod pipeline;
pub mod shared;
pub mod text;
