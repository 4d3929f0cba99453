// src/debug/helpers.rs

//! Miscellaneous helper functions for debug printing and testing.

use std::io::Write; // for `NamedTempFile.write_all`

use ::si_trace_print::defñ;

#[doc(hidden)]
pub use ::tempfile::NamedTempFile;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// temporary file helper functions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// NamedTempFile instances default to this file name prefix.
pub const STR_TEMPFILE_PREFIX: &str = "tmp-lis-test-";

/// Testing helper function to write bytes to a temporary file with the
/// passed file name `suffix`, e.g. `".clp.gz"`.
pub fn create_temp_file_bytes_with_suffix(data: &[u8], suffix: &str) -> NamedTempFile {
    let mut ntf = match tempfile::Builder::new()
        .prefix(STR_TEMPFILE_PREFIX)
        .suffix(suffix)
        .tempfile()
    {
        Ok(val) => val,
        Err(err) => {
            panic!("NamedTempFile::new() return Err {}", err);
        }
    };
    match ntf.write_all(data) {
        Ok(_) => {}
        Err(err) => {
            panic!("NamedTempFile::write_all() return Err {}", err);
        }
    }
    match ntf.flush() {
        Ok(_) => {}
        Err(err) => {
            panic!("NamedTempFile::flush() return Err {}", err);
        }
    }
    defñ!("wrote {} bytes to {:?}", data.len(), ntf.path());

    ntf
}
