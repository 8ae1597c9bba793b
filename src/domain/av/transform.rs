use std::ffi::OsString;
use std::path::Path;

/// Lowest video bitrate a compress pass will ask for, in kbps.
pub const MIN_VIDEO_KBPS: u32 = 250;

/// Highest video bitrate a compress pass will ask for, in kbps.
pub const MAX_VIDEO_KBPS: u32 = 50_000;

/// Bounding box for the resize pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Scale down to fit within `max` keeping the aspect ratio, never upscale,
/// and round both dimensions to even numbers for yuv420p.
pub fn resize_filter(max: Resolution) -> String {
    format!(
        "scale=w='min({w},iw)':h='min({h},ih)':force_original_aspect_ratio=decrease,\
         scale=trunc(iw/2)*2:trunc(ih/2)*2",
        w = max.width,
        h = max.height
    )
}

pub fn resize_args(input: &Path, output: &Path, max: Resolution) -> Vec<OsString> {
    let mut args = vec![OsString::from("-y"), OsString::from("-i")];
    args.push(input.as_os_str().to_owned());
    args.push(OsString::from("-vf"));
    args.push(OsString::from(resize_filter(max)));
    args.extend(
        [
            "-c:v", "libx264", "-preset", "fast", "-crf", "23", "-c:a", "copy", "-movflags",
            "+faststart",
        ]
        .iter()
        .map(OsString::from),
    );
    args.push(output.as_os_str().to_owned());
    args
}

pub fn compress_args(
    input: &Path,
    output: &Path,
    video_kbps: u32,
    audio_kbps: u32,
) -> Vec<OsString> {
    let mut args = vec![OsString::from("-y"), OsString::from("-i")];
    args.push(input.as_os_str().to_owned());
    args.extend(
        [
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "medium".to_string(),
            "-b:v".to_string(),
            format!("{}k", video_kbps),
            "-maxrate".to_string(),
            format!("{}k", video_kbps),
            "-bufsize".to_string(),
            format!("{}k", video_kbps.saturating_mul(2)),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            format!("{}k", audio_kbps),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ]
        .into_iter()
        .map(OsString::from),
    );
    args.push(output.as_os_str().to_owned());
    args
}

/// Video bitrate that would land a `duration_secs` clip near `target_bytes`
/// once the audio track is accounted for.
pub fn compress_bitrate_kbps(target_bytes: u64, duration_secs: f64, audio_kbps: u32) -> u32 {
    if duration_secs <= 0.0 || !duration_secs.is_finite() {
        return MIN_VIDEO_KBPS;
    }
    let total_kbps = (target_bytes as f64 * 8.0) / duration_secs / 1000.0;
    let video_kbps = total_kbps - audio_kbps as f64;
    video_kbps
        .floor()
        .clamp(MIN_VIDEO_KBPS as f64, MAX_VIDEO_KBPS as f64) as u32
}

/// Parses ffprobe's `format=duration` output (a bare float on one line).
pub fn parse_duration(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
}
