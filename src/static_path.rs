//! Live-remappable registry of served static directories.
//!
//! The registry maps an absolute filesystem path to a [`StaticDir`] handle.
//! Serving code holds handles; [`StaticRegistry::change_static_path`]
//! retargets a handle in place, so a remap is visible through handles grabbed
//! before the change. This is the only cross-request mutable state in the
//! crate, hence the locks.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// A served-directory handle. The target can change over the handle's
/// lifetime; read it through [`target`](StaticDir::target) or resolve URL
/// paths through [`resolve`](StaticDir::resolve).
pub struct StaticDir {
    target: RwLock<PathBuf>,
}

impl StaticDir {
    fn new(target: PathBuf) -> Self {
        Self { target: RwLock::new(target) }
    }

    /// The directory currently served through this handle.
    pub fn target(&self) -> PathBuf {
        self.target
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn retarget(&self, target: PathBuf) {
        *self.target.write().unwrap_or_else(PoisonError::into_inner) = target;
    }

    /// Maps a URL path to a filesystem path under the current target.
    /// Rejects parent-directory and other non-normal components, so a
    /// request cannot escape the served directory.
    pub fn resolve(&self, url_path: &str) -> Option<PathBuf> {
        let mut out = self.target();
        for comp in Path::new(url_path.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => out.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(out)
    }
}

/// Registry of served directories, keyed by absolute path.
///
/// Shared across all request workers (the app hands each context an `Arc`);
/// every operation takes the registry lock.
pub struct StaticRegistry {
    root: PathBuf,
    entries: Mutex<HashMap<PathBuf, Arc<StaticDir>>>,
}

impl StaticRegistry {
    /// `root` anchors relative paths passed to the other methods.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn absolutize(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_owned()
        } else {
            self.root.join(path)
        }
    }

    /// Registers a served directory and returns its handle. Registering the
    /// same path again replaces the previous handle.
    pub fn register(&self, path: impl AsRef<Path>) -> Arc<StaticDir> {
        let path = self.absolutize(path.as_ref());
        let dir = Arc::new(StaticDir::new(path.clone()));
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path, Arc::clone(&dir));
        dir
    }

    /// Returns the handle registered at `path`, if any.
    pub fn lookup(&self, path: impl AsRef<Path>) -> Option<Arc<StaticDir>> {
        let path = self.absolutize(path.as_ref());
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&path)
            .map(Arc::clone)
    }

    /// Remaps the directory served at `old` to `new`: removes the old key,
    /// retargets the handle in place, re-inserts it under the new key — all
    /// under one lock acquisition. An unregistered `old` is a silent no-op.
    pub fn change_static_path(&self, old: impl AsRef<Path>, new: impl AsRef<Path>) {
        let old = self.absolutize(old.as_ref());
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(dir) = entries.remove(&old) {
            let new = self.absolutize(new.as_ref());
            dir.retarget(new.clone());
            entries.insert(new, dir);
        }
    }

    /// Snapshot of the registered paths.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_static_path_rekeys_and_retargets() {
        let reg = StaticRegistry::new("/srv");
        reg.register("/srv/public");

        reg.change_static_path("/srv/public", "/srv/assets");

        assert!(reg.lookup("/srv/public").is_none());
        let dir = reg.lookup("/srv/assets").unwrap();
        assert_eq!(dir.target(), PathBuf::from("/srv/assets"));
    }

    #[test]
    fn change_is_visible_through_previously_held_handles() {
        let reg = StaticRegistry::new("/srv");
        let held = reg.register("/srv/public");

        reg.change_static_path("/srv/public", "/srv/assets");

        assert_eq!(held.target(), PathBuf::from("/srv/assets"));
        assert_eq!(held.resolve("css/site.css"), Some(PathBuf::from("/srv/assets/css/site.css")));
    }

    #[test]
    fn unregistered_old_path_is_a_no_op() {
        let reg = StaticRegistry::new("/srv");
        reg.register("/srv/public");

        let mut before = reg.paths();
        before.sort();
        reg.change_static_path("/srv/nonexistent", "/srv/elsewhere");
        let mut after = reg.paths();
        after.sort();

        assert_eq!(before, after);
        assert_eq!(
            reg.lookup("/srv/public").unwrap().target(),
            PathBuf::from("/srv/public"),
        );
    }

    #[test]
    fn relative_paths_resolve_against_root() {
        let reg = StaticRegistry::new("/srv/app");
        reg.register("public");

        assert!(reg.lookup("/srv/app/public").is_some());

        reg.change_static_path("public", "assets");
        assert!(reg.lookup("/srv/app/assets").is_some());
    }

    #[test]
    fn resolve_rejects_traversal() {
        let reg = StaticRegistry::new("/srv");
        let dir = reg.register("/srv/public");

        assert!(dir.resolve("../etc/passwd").is_none());
        assert!(dir.resolve("a/../../b").is_none());
        assert_eq!(dir.resolve("./index.html"), Some(PathBuf::from("/srv/public/index.html")));
    }
}
