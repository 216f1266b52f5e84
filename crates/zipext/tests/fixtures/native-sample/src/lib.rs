//! Native sample module for the dylib import tests.
//!
//! One library backs several module names: the loader resolves
//! `zipext_init_<leaf>`, so the same file can be stored as `pkg/__init__`,
//! `pkg/two`, `two` and `bad` inside an archive.

use std::os::raw::c_int;

#[no_mangle]
pub extern "C" fn zipext_init_pkg() -> c_int {
    0
}

#[no_mangle]
pub extern "C" fn zipext_init_two() -> c_int {
    0
}

/// Fails initialisation with a non-zero status.
#[no_mangle]
pub extern "C" fn zipext_init_bad() -> c_int {
    3
}

/// Lets tests call into a loaded copy.
#[no_mangle]
pub extern "C" fn zipext_sample_answer() -> c_int {
    42
}
