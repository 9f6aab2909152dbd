use likes_core::{FileFilter, SavePathPrompt};
use rfd::FileDialog;
use std::path::PathBuf;

/// Native "Save as" dialog.
///
/// Blocks the calling thread until the user answers, so call it from
/// `tokio::task::block_in_place` inside the runtime.
pub struct NativeSaveDialog {
    title: String,
}

impl NativeSaveDialog {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

impl SavePathPrompt for NativeSaveDialog {
    fn prompt_for_save_path(&self, default_name: &str, filter: &FileFilter) -> Option<PathBuf> {
        FileDialog::new()
            .set_title(self.title.as_str())
            .set_file_name(default_name)
            .add_filter(filter.name.as_str(), filter.extensions.as_slice())
            .add_filter("All files", &["*"])
            .save_file()
    }
}
