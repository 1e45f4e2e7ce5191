use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::models::config::CollisionPolicy;
use crate::models::error::CaptureError;

/// Sub-directory of the base directory that holds all captures.
pub const CAPTURE_DIR_NAME: &str = "AudioCaptures";

/// Day-month-year, then 12-hour clock time.
const TIMESTAMP_FORMAT: &str = "%d-%m-%Y-%I-%M-%S";

const MAX_SUFFIX: u32 = 999;

/// `base_dir/AudioCaptures`.
pub fn capture_directory(base_dir: &Path) -> PathBuf {
    base_dir.join(CAPTURE_DIR_NAME)
}

/// File stem for a capture started at `now`, e.g. `Capture-05-03-2024-02-07-09`.
pub fn capture_stem(now: NaiveDateTime) -> String {
    format!("Capture-{}", now.format(TIMESTAMP_FORMAT))
}

/// Resolve the output path for a capture started at `now`.
///
/// Creates `base_dir/AudioCaptures/` if it is missing. With
/// `CollisionPolicy::AppendSuffix` a taken name gets `-1`, `-2`, ... appended
/// to its stem; with `CollisionPolicy::Fail` it is reported as `PathCollision`.
pub fn resolve_path(base_dir: &Path, now: NaiveDateTime, policy: CollisionPolicy) -> Result<PathBuf, CaptureError> {
    let dir = capture_directory(base_dir);
    fs::create_dir_all(&dir).map_err(|e| {
        CaptureError::OutputUnavailable(format!("failed to create {}: {}", dir.display(), e))
    })?;

    let stem = capture_stem(now);
    let path = dir.join(format!("{}.pcm", stem));
    if !path.exists() {
        return Ok(path);
    }

    match policy {
        CollisionPolicy::Fail => Err(CaptureError::PathCollision(path)),
        CollisionPolicy::AppendSuffix => (1..=MAX_SUFFIX)
            .map(|n| dir.join(format!("{}-{}.pcm", stem, n)))
            .find(|candidate| !candidate.exists())
            .ok_or(CaptureError::PathCollision(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn afternoon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 7, 9)
            .unwrap()
    }

    #[test]
    fn name_uses_day_month_year_and_12_hour_clock() {
        assert_eq!(capture_stem(afternoon()), "Capture-05-03-2024-02-07-09");
    }

    #[test]
    fn creates_capture_directory() {
        let base = tempfile::tempdir().unwrap();
        let path = resolve_path(base.path(), afternoon(), CollisionPolicy::Fail).unwrap();

        assert!(base.path().join("AudioCaptures").is_dir());
        assert_eq!(
            path,
            base.path().join("AudioCaptures").join("Capture-05-03-2024-02-07-09.pcm")
        );
        assert!(!path.exists());
    }

    #[test]
    fn directory_creation_is_idempotent() {
        let base = tempfile::tempdir().unwrap();
        fs::create_dir_all(base.path().join("AudioCaptures")).unwrap();
        assert!(resolve_path(base.path(), afternoon(), CollisionPolicy::Fail).is_ok());
    }

    #[test]
    fn collision_fails_when_configured() {
        let base = tempfile::tempdir().unwrap();
        let first = resolve_path(base.path(), afternoon(), CollisionPolicy::Fail).unwrap();
        fs::write(&first, b"taken").unwrap();

        let err = resolve_path(base.path(), afternoon(), CollisionPolicy::Fail).unwrap_err();
        assert_eq!(err, CaptureError::PathCollision(first));
    }

    #[test]
    fn collision_appends_suffix() {
        let base = tempfile::tempdir().unwrap();
        let first = resolve_path(base.path(), afternoon(), CollisionPolicy::AppendSuffix).unwrap();
        fs::write(&first, b"taken").unwrap();

        let second = resolve_path(base.path(), afternoon(), CollisionPolicy::AppendSuffix).unwrap();
        assert_eq!(second.file_name().unwrap(), "Capture-05-03-2024-02-07-09-1.pcm");
        fs::write(&second, b"taken").unwrap();

        let third = resolve_path(base.path(), afternoon(), CollisionPolicy::AppendSuffix).unwrap();
        assert_eq!(third.file_name().unwrap(), "Capture-05-03-2024-02-07-09-2.pcm");
    }

    #[test]
    fn unwritable_base_is_output_unavailable() {
        let base = tempfile::tempdir().unwrap();
        let blocker = base.path().join("not-a-dir");
        fs::write(&blocker, b"file").unwrap();

        let err = resolve_path(&blocker, afternoon(), CollisionPolicy::Fail).unwrap_err();
        assert!(matches!(err, CaptureError::OutputUnavailable(_)));
    }
}
