//! CLI exit codes.
//!
//! Scripts rely on these; treat them as part of the shell contract.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | Sheet error (syntax error, circular dependency, ...) |
//! | 2    | Usage error (bad arguments, malformed script line)   |
//! | 3    | I/O error (unreadable script, closed stdout)         |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// A sheet operation was rejected.
pub const EXIT_SHEET: u8 = 1;

/// Usage error - bad arguments or a script line that does not parse.
pub const EXIT_USAGE: u8 = 2;

/// Reading input or writing output failed.
pub const EXIT_IO: u8 = 3;
