//! Fakes shared by the application tests.

use crate::ports::encoder::EncoderExit;
use std::ffi::OsString;
use std::path::PathBuf;

fn output_of(args: &[OsString]) -> PathBuf {
    PathBuf::from(args.last().expect("output argument"))
}

fn input_of(args: &[OsString]) -> PathBuf {
    args.iter()
        .position(|a| a == "-i")
        .map(|i| PathBuf::from(&args[i + 1]))
        .expect("input argument")
}

/// Stands in for a stream-copy concat: reads the manifest and writes the
/// listed files' contents to the output in manifest order.
pub fn fake_concat(args: &[OsString]) -> std::io::Result<EncoderExit> {
    let listing = std::fs::read_to_string(input_of(args))?;
    let mut merged = Vec::new();
    for line in listing.lines() {
        let path = line.trim_start_matches("file '").trim_end_matches('\'');
        merged.extend(std::fs::read(path)?);
    }
    std::fs::write(output_of(args), merged)?;
    Ok(EncoderExit::ok())
}

/// Stands in for a transform: writes a `size`-byte output.
pub fn fake_transcode(args: &[OsString], size: u64) -> std::io::Result<EncoderExit> {
    sparse_file(&output_of(args), size);
    Ok(EncoderExit::ok())
}

/// Whether `args` describe a concat run rather than a transform.
pub fn is_concat(args: &[OsString]) -> bool {
    args.iter().any(|a| a == "concat")
}

/// Whether `args` describe a resize run.
pub fn is_resize(args: &[OsString]) -> bool {
    args.iter().any(|a| a == "-vf")
}

/// Writes a file of `size` bytes without allocating it in memory.
pub fn sparse_file(path: &std::path::Path, size: u64) {
    let file = std::fs::File::create(path).expect("create sparse file");
    file.set_len(size).expect("size sparse file");
}
