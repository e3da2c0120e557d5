#![allow(dead_code)]

pub mod relay_mocks;
pub mod socket_guard;
