// tests/integration/main.rs

mod config_handling;
mod fs_abstraction;
mod input_commands;
mod target_files;
mod terminal_display;
