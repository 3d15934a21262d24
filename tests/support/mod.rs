#![allow(dead_code)]

pub mod critical_utils;
pub mod memory_repository;
pub mod socket_guard;
