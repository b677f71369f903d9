use tempfile::TempDir;

use super::DB;

/// Open a fresh db in a temporary directory. The directory is removed when the
/// returned `TempDir` is dropped, so keep it alive for the duration of the test.
#[allow(clippy::unwrap_used)]
pub fn tmp_db() -> (TempDir, DB) {
    let dir = tempfile::tempdir().unwrap();
    let db = DB::from_path(dir.path()).unwrap();
    (dir, db)
}
