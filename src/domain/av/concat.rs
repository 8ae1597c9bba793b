use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Contents of an ffmpeg concat-demuxer list file, one `file '<path>'` line
/// per input, in order.
pub fn concat_manifest(inputs: &[PathBuf]) -> String {
    let mut manifest = String::new();
    for path in inputs {
        // Single quotes inside a quoted entry are closed, escaped, reopened.
        let escaped = path.to_string_lossy().replace('\'', r"'\''");
        manifest.push_str("file '");
        manifest.push_str(&escaped);
        manifest.push_str("'\n");
    }
    manifest
}

/// Arguments for a stream-copy concatenation of the files listed in
/// `manifest` into `output`.
pub fn concat_args(manifest: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-y", "-f", "concat", "-safe", "0", "-i"]
        .iter()
        .map(OsString::from)
        .collect();
    args.push(manifest.as_os_str().to_owned());
    args.extend(["-c", "copy", "-movflags", "+faststart"].iter().map(OsString::from));
    args.push(output.as_os_str().to_owned());
    args
}
