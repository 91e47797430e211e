pub mod blurrer_factory;
pub mod cpu_region_blurrer;
mod gaussian;
