pub mod headless;
pub mod nop;
