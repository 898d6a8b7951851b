#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use taskstate::execution::ExecutionContext;
use taskstate::fs::FileSystem;
use taskstate::fs::mock::MockFileSystem;
use taskstate::history::HistoryStore;
use taskstate::snapshot::FileSnapshotter;

pub use taskstate_test_utils::init_tracing;

pub const ROOT: &str = "/project";
pub const HISTORY_DIR: &str = ".taskstate/history";

/// An empty mock project rooted at [`ROOT`].
pub fn mock_project() -> (MockFileSystem, PathBuf) {
    let fs = MockFileSystem::new();
    let root = PathBuf::from(ROOT);
    fs.add_dir(&root);
    (fs, root)
}

/// Execution context over `fs` with an on-disk (mock) history store.
pub fn mock_context(fs: &MockFileSystem, root: &Path) -> ExecutionContext {
    let shared: Arc<dyn FileSystem> = Arc::new(fs.clone());
    let store = HistoryStore::on_disk(Arc::clone(&shared), root.join(HISTORY_DIR));
    ExecutionContext::new(store, FileSnapshotter::new(shared, root)).skip_dir(HISTORY_DIR)
}
