// src/lib.rs

pub mod api;
pub mod auth;
pub mod core;
pub mod models;
pub mod network;
pub mod payments;
pub mod seed;
pub mod services;
pub mod storage;
