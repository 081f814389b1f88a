// src/cache/mod.rs
mod slot;

pub use slot::TtlSlot;
