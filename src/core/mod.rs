// src/core/mod.rs

pub mod html;
pub mod numbers;
pub mod sanitize;
