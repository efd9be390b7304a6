pub mod calldata;
pub mod calls;
