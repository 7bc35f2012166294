// Serial terminal library - exposes all core modules for testing

pub mod app;
pub mod config;
pub mod config_io;
pub mod input;
pub mod model;
pub mod primitives;
pub mod services;
pub mod view;
