//! Integration tests against the public API

mod components;
mod config;
mod controller;
