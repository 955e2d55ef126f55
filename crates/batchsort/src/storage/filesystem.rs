use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::rename::split_extension;
use crate::workspace::ensure_directory;

/// Writes into and copies within one directory owned by a job.
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Streams an uploaded file into the root directory.
    ///
    /// Never overwrites: a taken name gets a numbered variant
    /// (`photo.png`, `photo_2.png`, ...). Returns the written path and the
    /// number of bytes written.
    pub fn store_upload(
        &self,
        filename: &str,
        content: &mut dyn Read,
    ) -> Result<(PathBuf, u64), StorageError> {
        ensure_directory(&self.root)?;
        let (base, ext) = split_extension(filename);

        for counter in 1..=1000 {
            let try_filename = if counter == 1 {
                filename.to_string()
            } else {
                format!("{}_{}{}", base, counter, ext)
            };
            let try_path = self.root.join(&try_filename);

            // create_new is an atomic check-and-create
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&try_path)
            {
                Ok(mut file) => {
                    return match std::io::copy(content, &mut file) {
                        Ok(written) => Ok((try_path, written)),
                        Err(e) => {
                            drop(file);
                            let _ = std::fs::remove_file(&try_path);
                            Err(StorageError::WriteFile {
                                path: try_path,
                                source: e,
                            })
                        }
                    };
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StorageError::WriteFile {
                        path: try_path,
                        source: e,
                    });
                }
            }
        }

        Err(StorageError::FileExists(self.root.join(filename)))
    }

    /// Copies `source` to `<root>/<category>/<new_name>`. The source is
    /// left in place.
    pub fn stage(
        &self,
        source: &Path,
        category: &str,
        new_name: &str,
    ) -> Result<PathBuf, StorageError> {
        if !source.is_file() {
            return Err(StorageError::SourceMissing(source.to_path_buf()));
        }
        validate_name(category)?;
        validate_name(new_name)?;

        let dir_path = self.root.join(category);
        ensure_directory(&dir_path)?;

        let target = dir_path.join(new_name);
        std::fs::copy(source, &target).map_err(|e| StorageError::CopyFile {
            from: source.to_path_buf(),
            to: target.clone(),
            source: e,
        })?;
        Ok(target)
    }
}

fn validate_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(StorageError::InvalidComponent(name.to_string()));
    }
    Ok(())
}
