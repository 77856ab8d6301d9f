//! Upload folder listing.
//!
//! Each configured upload root holds one folder per study, named by the
//! study id. Files there are candidates for linking to raw data.

use crate::model::study::StudyId;
use std::io;
use std::path::PathBuf;

/// Lists files uploaded for `study_id` across every upload root.
///
/// Hidden files are skipped, a root without a folder for the study
/// contributes nothing, and the result is sorted by name.
pub fn files_from_uploads_folders(roots: &[PathBuf], study_id: StudyId) -> io::Result<Vec<String>> {
    let mut files = Vec::new();
    for root in roots {
        let study_dir = root.join(study_id.to_string());
        if !study_dir.is_dir() {
            continue;
        }

        for entry in std::fs::read_dir(&study_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            files.push(name);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::files_from_uploads_folders;
    use std::fs;

    #[test]
    fn lists_visible_files_of_the_study_across_roots() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::create_dir_all(first.path().join("1")).unwrap();
        fs::create_dir_all(second.path().join("1/nested")).unwrap();
        fs::create_dir_all(first.path().join("2")).unwrap();
        fs::write(first.path().join("1/uploaded_file.txt"), "x").unwrap();
        fs::write(first.path().join("1/.hidden"), "x").unwrap();
        fs::write(second.path().join("1/barcodes.fastq"), "x").unwrap();
        fs::write(first.path().join("2/other_study.txt"), "x").unwrap();

        let roots = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        let files = files_from_uploads_folders(&roots, 1).unwrap();
        assert_eq!(files, vec!["barcodes.fastq", "uploaded_file.txt"]);
    }

    #[test]
    fn missing_study_folder_is_empty() {
        let root = tempfile::tempdir().unwrap();
        let files = files_from_uploads_folders(&[root.path().to_path_buf()], 42).unwrap();
        assert!(files.is_empty());
    }
}
