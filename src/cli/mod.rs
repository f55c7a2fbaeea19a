//! # CLI Module
//!
//! Command-line tools for inspecting a route file.
//!
//! ## Commands
//!
//! ### `routes`
//!
//! Print the compiled table in match order:
//!
//! ```bash
//! piperoute --file config/routes.yaml routes
//! ```
//!
//! ### `match`
//!
//! Resolve a request and print the winning route and its bound parameters:
//!
//! ```bash
//! piperoute match --method GET --host api.example.com --path /users/42
//! ```
//!
//! ### `path`
//!
//! Build a path from a helper name:
//!
//! ```bash
//! piperoute path --helper user --param id=42 --param tab=posts
//! ```
//!
//! Parameters the template does not bind are appended as a query string.
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use piperoute::cli::run_cli;
//!
//! run_cli()?;
//! ```

mod commands;


pub use commands::{execute, run_cli, Cli, Commands};
