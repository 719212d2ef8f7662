// ABOUTME: Library crate for iotalert exposing the wizard engine, gateway client and TUI pieces

#![allow(missing_docs)]

pub mod app;
pub mod cli;
pub mod components;
pub mod config;
pub mod gateway;
pub mod models;
pub mod wizard;
