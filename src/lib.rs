//! Skeleton Windows Explorer shell extension.
//!
//! An in-process COM server exposing one class whose object implements
//! `IShellExtInit` and nothing else. Registration, class activation and unload
//! negotiation are complete; shell features hang off `extension::ShellExtension`.
//!
//! Only the registry layout, the load counter and the diagnostics plumbing are
//! platform independent; everything touching COM is Windows-only.

#![allow(non_snake_case)]
#![deny(unsafe_op_in_unsafe_fn)]
#![cfg_attr(not(windows), allow(dead_code))]

mod constants;
mod guid;
mod logging;
mod panic;
mod refcount;
mod registration;
mod settings;

#[cfg(windows)]
mod exports;
#[cfg(windows)]
mod extension;
#[cfg(windows)]
mod factory;
#[cfg(windows)]
mod module;
#[cfg(windows)]
mod registry;
#[cfg(windows)]
mod string;
