pub mod protocol;
pub mod relay;
