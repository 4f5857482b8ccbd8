//! Builder for `.tar.gz` test fixtures.

use flate2::Compression;
use flate2::write::GzEncoder;
use std::path::Path;
use tar::{EntryType, Header};

enum Entry {
    File {
        name: String,
        body: Vec<u8>,
        mode: u32,
    },
    Dir {
        name: String,
    },
    Symlink {
        name: String,
        target: String,
    },
}

/// Builds gzip-compressed tar archives in memory.
///
/// Entries are written in insertion order, so tests can control which of two
/// same-named entries comes first.
#[derive(Default)]
pub struct TarGzBuilder {
    entries: Vec<Entry>,
}

impl TarGzBuilder {
    /// Start an empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a regular file with the given mode bits.
    pub fn file(mut self, name: &str, body: &[u8], mode: u32) -> Self {
        self.entries.push(Entry::File {
            name: name.to_string(),
            body: body.to_vec(),
            mode,
        });
        self
    }

    /// Add a directory entry.
    pub fn dir(mut self, name: &str) -> Self {
        self.entries.push(Entry::Dir {
            name: name.to_string(),
        });
        self
    }

    /// Add a symbolic link entry.
    pub fn symlink(mut self, name: &str, target: &str) -> Self {
        self.entries.push(Entry::Symlink {
            name: name.to_string(),
            target: target.to_string(),
        });
        self
    }

    /// Encode the archive.
    ///
    /// # Panics
    ///
    /// Panics if writing to the in-memory buffer fails, which only happens on
    /// invalid entry names.
    pub fn build(self) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for entry in self.entries {
            match entry {
                Entry::File {
                    name,
                    body,
                    mode,
                } => {
                    let mut header = Header::new_gnu();
                    header.set_entry_type(EntryType::Regular);
                    header.set_size(body.len() as u64);
                    header.set_mode(mode);
                    header.set_cksum();
                    builder.append_data(&mut header, &name, body.as_slice()).expect("append file");
                }
                Entry::Dir {
                    name,
                } => {
                    let mut header = Header::new_gnu();
                    header.set_entry_type(EntryType::Directory);
                    header.set_size(0);
                    header.set_mode(0o755);
                    header.set_cksum();
                    builder.append_data(&mut header, &name, std::io::empty()).expect("append dir");
                }
                Entry::Symlink {
                    name,
                    target,
                } => {
                    let mut header = Header::new_gnu();
                    header.set_entry_type(EntryType::Symlink);
                    header.set_size(0);
                    header.set_mode(0o777);
                    builder.append_link(&mut header, &name, &target).expect("append symlink");
                }
            }
        }

        builder.into_inner().expect("finish tar").finish().expect("finish gzip")
    }

    /// Encode the archive and write it to `path`.
    pub fn write_to(self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.build())
    }
}
