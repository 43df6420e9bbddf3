use std::{fs, path::Path};

use crate::error::MergeError;

pub fn read_file_to_string(path: &Path) -> Result<String, MergeError> {
    fs::read_to_string(path).map_err(|err| MergeError::unreadable(path, &err))
}

pub fn write_string_to_file(path: &Path, contents: &str) -> Result<(), MergeError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            MergeError::Input(format!("could not create {}: {err}", parent.display()))
        })?;
    }
    fs::write(path, contents)
        .map_err(|err| MergeError::Input(format!("could not write {}: {err}", path.display())))
}
