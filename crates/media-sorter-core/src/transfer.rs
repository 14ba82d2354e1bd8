use std::fs::{self, File};
use std::io::{self, ErrorKind};
use std::path::Path;
use tracing::{debug, warn};

/// Move `from` to `to` without ever losing the source.
///
/// A plain rename is tried first. When that is not possible (different
/// filesystem, some network shares) the file is copied, synced, and only then
/// is the source removed. If the copy fails, or the source cannot be removed
/// afterwards, the target is removed and the source is left as it was. An existing `to` is never overwritten.
pub fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if to.exists() {
        return Err(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("destination {} already exists", to.display()),
        ));
    }

    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err)
            if matches!(
                rename_err.kind(),
                ErrorKind::CrossesDevices | ErrorKind::PermissionDenied | ErrorKind::Unsupported
            ) =>
        {
            debug!(
                "Rename {} -> {} failed ({}), falling back to copy",
                from.display(),
                to.display(),
                rename_err
            );
            copy_then_remove(from, to)
        }
        Err(rename_err) => Err(rename_err),
    }
}

fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    copy_then_remove_with(from, to, |path| fs::remove_file(path))
}

/// Copy, then hand the source to `remove_source`. Whichever step fails, the
/// copy is taken back out so only the source remains.
pub(crate) fn copy_then_remove_with(
    from: &Path,
    to: &Path,
    remove_source: impl FnOnce(&Path) -> io::Result<()>,
) -> io::Result<()> {
    if let Err(e) = fs::copy(from, to).and_then(|_| File::open(to)?.sync_all()) {
        let _ = fs::remove_file(to);
        return Err(e);
    }
    if let Err(e) = remove_source(from) {
        if let Err(cleanup) = fs::remove_file(to) {
            warn!("Could not remove copy {} after failed move: {}", to.display(), cleanup);
        }
        return Err(e);
    }
    Ok(())
}
