#![allow(dead_code)]

pub mod setup;
pub mod stores;
