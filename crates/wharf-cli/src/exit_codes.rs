//! Process exit codes
//!
//! These follow Unix conventions and sysexits.h where applicable.

#![allow(dead_code)]

/// Operation completed without issues
pub const SUCCESS: i32 = 0;

/// Unspecified failure
pub const ERROR: i32 = 1;

/// Metadata, version or release validation failed
pub const VALIDATION_ERROR: i32 = 2;

/// A dependency could not be resolved or installed
pub const RESOLUTION_ERROR: i32 = 3;

/// A release task failed while running
pub const RELEASE_ERROR: i32 = 4;

/// File not found, permission denied and the like
pub const IO_ERROR: i32 = 5;

/// Invalid arguments or configuration (sysexits.h `EX_USAGE`)
pub const USAGE_ERROR: i32 = 64;
