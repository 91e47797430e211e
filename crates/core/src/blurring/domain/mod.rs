pub mod alpha_mask;
pub mod frame_blurrer;
pub mod mask_compositor;
