pub mod dify;
