pub mod client_ctx;
pub mod csrf;
pub mod flash;

pub use client_ctx::ClientCtx;
