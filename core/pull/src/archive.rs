//! In-memory archive extraction.
//!
//! An [`ArchiveHandle`] is a format-aware view over the bytes of a downloaded
//! asset. The format is inferred from the asset's file name; members are
//! listed lazily and extracted one at a time, always into memory.
//!
//! ## Supported Formats
//!
//! | Suffix                | Container                           |
//! |-----------------------|-------------------------------------|
//! | `.tar.gz`, `.tgz`     | tar, gzip compressed                |
//! | `.tar.bz2`            | tar, bzip2 compressed               |
//! | `.tar.xz`             | tar, xz compressed                  |
//! | `.tar`                | tar, uncompressed                   |
//! | `.zip`                | zip                                 |
//! | `.deb`                | Unix `ar` archive (Debian package)  |
//! | `.gz` (not a tar)     | single gzip stream, one member      |
//!
//! ## Nesting
//!
//! An extracted member can be reopened as a new handle using its own name,
//! e.g. `data.tar.xz` inside a `.deb`:
//!
//! ```ignore
//! let deb = ArchiveHandle::new("ripgrep_14.1.1-1_amd64.deb", bytes)?;
//! let data = ArchiveHandle::new("data.tar.xz", deb.extract("data.tar.xz")?)?;
//! let rg = data.extract("./usr/bin/rg")?;
//! ```

use std::fmt;
use std::io::{Cursor, Read};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use once_cell::unsync::OnceCell;
use xz2::read::XzDecoder;

use crate::errors::{PullError, Result};

/// Compression applied on top of a tar stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TarCompression {
    None,
    Gzip,
    Bzip2,
    Xz,
}

/// Container format of an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tar(TarCompression),
    Zip,
    Ar,
    Gzip,
}

impl ArchiveFormat {
    /// Infers the format from a file name.
    ///
    /// Only the base name is considered and the comparison ignores case.
    /// Compound tar suffixes take precedence over `.gz`.
    ///
    /// # Errors
    ///
    /// Returns [`PullError::Extraction`] when no supported suffix matches.
    pub fn detect(file_name: &str) -> Result<Self> {
        let base = base_name(file_name).to_ascii_lowercase();

        let format = if base.ends_with(".tar.gz") || base.ends_with(".tgz") {
            Self::Tar(TarCompression::Gzip)
        } else if base.ends_with(".tar.bz2") {
            Self::Tar(TarCompression::Bzip2)
        } else if base.ends_with(".tar.xz") {
            Self::Tar(TarCompression::Xz)
        } else if base.ends_with(".tar") {
            Self::Tar(TarCompression::None)
        } else if base.ends_with(".zip") {
            Self::Zip
        } else if base.ends_with(".deb") {
            Self::Ar
        } else if base.ends_with(".gz") {
            Self::Gzip
        } else {
            return Err(PullError::extraction(format!(
                "unsupported archive format: {file_name}"
            )));
        };
        Ok(format)
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tar(TarCompression::None) => "tar",
            Self::Tar(TarCompression::Gzip) => "tar.gz",
            Self::Tar(TarCompression::Bzip2) => "tar.bz2",
            Self::Tar(TarCompression::Xz) => "tar.xz",
            Self::Zip => "zip",
            Self::Ar => "ar",
            Self::Gzip => "gzip",
        };
        f.write_str(name)
    }
}

/// Returns the last `/`-separated component of a member or file name.
#[must_use]
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Format-aware view over archive bytes.
///
/// The member list is computed on first use and memoized for the lifetime of
/// the handle. Handles are cheap and meant to be discarded after use.
pub struct ArchiveHandle {
    name: String,
    format: ArchiveFormat,
    data: Vec<u8>,
    members: OnceCell<Vec<String>>,
}

impl fmt::Debug for ArchiveHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveHandle")
            .field("name", &self.name)
            .field("format", &self.format)
            .field("len", &self.data.len())
            .finish_non_exhaustive()
    }
}

impl ArchiveHandle {
    /// Opens `data` as an archive whose format is inferred from `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PullError::Extraction`] if the name carries no supported suffix.
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let format = ArchiveFormat::detect(&name)?;
        Ok(Self {
            name,
            format,
            data,
            members: OnceCell::new(),
        })
    }

    /// The nominal file name this handle was opened with.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The detected container format.
    #[must_use]
    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    /// Lists the regular-file members, in archive order.
    ///
    /// # Errors
    ///
    /// Returns [`PullError::Extraction`] if the archive cannot be read.
    pub fn members(&self) -> Result<&[String]> {
        self.members
            .get_or_try_init(|| self.list_members())
            .map(Vec::as_slice)
    }

    /// Returns the first member whose base name equals `file_name`.
    ///
    /// # Errors
    ///
    /// Returns [`PullError::Extraction`] if the archive cannot be read.
    pub fn find_by_base_name(&self, file_name: &str) -> Result<Option<&str>> {
        Ok(self
            .members()?
            .iter()
            .find(|member| base_name(member) == file_name)
            .map(String::as_str))
    }

    /// Extracts the content of `member`.
    ///
    /// Gzip streams have a single member and ignore the name.
    ///
    /// # Errors
    ///
    /// Returns [`PullError::Extraction`] if the archive is corrupt or does
    /// not contain `member`.
    pub fn extract(&self, member: &str) -> Result<Vec<u8>> {
        let found = match self.format {
            ArchiveFormat::Tar(compression) => self.extract_tar(compression, member)?,
            ArchiveFormat::Zip => self.extract_zip(member)?,
            ArchiveFormat::Ar => self.extract_ar(member)?,
            ArchiveFormat::Gzip => Some(self.decompress_gzip()?),
        };
        found.ok_or_else(|| {
            PullError::extraction(format!("member {member} not found in {}", self.name))
        })
    }

    fn list_members(&self) -> Result<Vec<String>> {
        match self.format {
            ArchiveFormat::Tar(compression) => self.list_tar(compression),
            ArchiveFormat::Zip => self.list_zip(),
            ArchiveFormat::Ar => self.list_ar(),
            ArchiveFormat::Gzip => Ok(vec![self.gzip_member_name()]),
        }
    }

    fn corrupt(&self, err: impl fmt::Display) -> PullError {
        PullError::extraction(format!(
            "failed to read {} archive {}: {err}",
            self.format, self.name
        ))
    }

    fn tar_stream(&self, compression: TarCompression) -> Box<dyn Read + '_> {
        let cursor = Cursor::new(self.data.as_slice());
        match compression {
            TarCompression::None => Box::new(cursor),
            TarCompression::Gzip => Box::new(GzDecoder::new(cursor)),
            TarCompression::Bzip2 => Box::new(BzDecoder::new(cursor)),
            TarCompression::Xz => Box::new(XzDecoder::new(cursor)),
        }
    }

    fn list_tar(&self, compression: TarCompression) -> Result<Vec<String>> {
        let mut archive = tar::Archive::new(self.tar_stream(compression));
        let mut members = Vec::new();
        for entry in archive.entries().map_err(|e| self.corrupt(e))? {
            let entry = entry.map_err(|e| self.corrupt(e))?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let path = entry.path().map_err(|e| self.corrupt(e))?;
            members.push(path.to_string_lossy().into_owned());
        }
        Ok(members)
    }

    fn extract_tar(&self, compression: TarCompression, member: &str) -> Result<Option<Vec<u8>>> {
        let mut archive = tar::Archive::new(self.tar_stream(compression));
        for entry in archive.entries().map_err(|e| self.corrupt(e))? {
            let mut entry = entry.map_err(|e| self.corrupt(e))?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let matches = entry
                .path()
                .map_err(|e| self.corrupt(e))?
                .to_string_lossy()
                == member;
            if matches {
                let mut buf = Vec::new();
                entry.read_to_end(&mut buf).map_err(|e| self.corrupt(e))?;
                return Ok(Some(buf));
            }
        }
        Ok(None)
    }

    fn open_zip(&self) -> Result<zip::ZipArchive<Cursor<&[u8]>>> {
        zip::ZipArchive::new(Cursor::new(self.data.as_slice())).map_err(|e| self.corrupt(e))
    }

    fn list_zip(&self) -> Result<Vec<String>> {
        let mut archive = self.open_zip()?;
        let mut members = Vec::new();
        for i in 0..archive.len() {
            let file = archive.by_index(i).map_err(|e| self.corrupt(e))?;
            if file.is_file() {
                members.push(file.name().to_string());
            }
        }
        Ok(members)
    }

    fn extract_zip(&self, member: &str) -> Result<Option<Vec<u8>>> {
        let mut archive = self.open_zip()?;
        let mut file = match archive.by_name(member) {
            Ok(file) if file.is_file() => file,
            Ok(_) | Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(self.corrupt(e)),
        };
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).map_err(|e| self.corrupt(e))?;
        Ok(Some(buf))
    }

    fn list_ar(&self) -> Result<Vec<String>> {
        let mut archive = ar::Archive::new(Cursor::new(self.data.as_slice()));
        let mut members = Vec::new();
        while let Some(entry) = archive.next_entry() {
            let entry = entry.map_err(|e| self.corrupt(e))?;
            members.push(ar_identifier(entry.header()));
        }
        Ok(members)
    }

    fn extract_ar(&self, member: &str) -> Result<Option<Vec<u8>>> {
        let mut archive = ar::Archive::new(Cursor::new(self.data.as_slice()));
        while let Some(entry) = archive.next_entry() {
            let mut entry = entry.map_err(|e| self.corrupt(e))?;
            if ar_identifier(entry.header()) == member {
                let mut buf = Vec::new();
                entry.read_to_end(&mut buf).map_err(|e| self.corrupt(e))?;
                return Ok(Some(buf));
            }
        }
        Ok(None)
    }

    fn gzip_member_name(&self) -> String {
        let base = base_name(&self.name);
        // `.gz` is ASCII, so the suffix is three bytes regardless of case.
        base[..base.len() - 3].to_string()
    }

    fn decompress_gzip(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        GzDecoder::new(self.data.as_slice())
            .read_to_end(&mut buf)
            .map_err(|e| self.corrupt(e))?;
        Ok(buf)
    }
}

/// GNU `ar` terminates identifiers with `/`.
fn ar_identifier(header: &ar::Header) -> String {
    String::from_utf8_lossy(header.identifier())
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tar::Builder;

    const CONTENT: &[u8] = b"hello from the archive\n";

    /// Builds a tar stream with a directory entry, a symlink and `dir/file.txt`.
    fn tar_bytes<W: Write>(writer: W) -> W {
        let mut builder = Builder::new(writer);

        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Directory);
        header.set_size(0);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, "dir/", std::io::empty())
            .expect("Should append directory");

        let mut header = tar::Header::new_gnu();
        header.set_size(CONTENT.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "dir/file.txt", CONTENT)
            .expect("Should append file");

        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Symlink);
        header.set_size(0);
        header.set_mode(0o777);
        builder
            .append_link(&mut header, "dir/link", "file.txt")
            .expect("Should append symlink");

        builder.into_inner().expect("Should finish tar")
    }

    fn zip_bytes() -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        writer
            .add_directory("dir/", options)
            .expect("Should add directory");
        writer
            .start_file("dir/file.txt", options)
            .expect("Should start file");
        writer.write_all(CONTENT).expect("Should write file");
        writer.finish().expect("Should finish zip").into_inner()
    }

    fn ar_bytes(members: &[(&str, &[u8])]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut builder = ar::Builder::new(&mut out);
            for (name, data) in members {
                let header = ar::Header::new(name.as_bytes().to_vec(), data.len() as u64);
                builder.append(&header, *data).expect("Should append member");
            }
        }
        out
    }

    fn gzip_bytes(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).expect("Should compress");
        encoder.finish().expect("Should finish gzip")
    }

    fn xz_tar_bytes() -> Vec<u8> {
        let encoder = tar_bytes(xz2::write::XzEncoder::new(Vec::new(), 6));
        encoder.finish().expect("Should finish xz")
    }

    fn assert_lists_and_extracts(handle: &ArchiveHandle) {
        let members = handle.members().expect("Should list members");
        assert_eq!(members, ["dir/file.txt"]);
        assert_eq!(handle.extract("dir/file.txt").expect("Should extract"), CONTENT);
    }

    #[test]
    fn detect_recognizes_every_supported_suffix() {
        let cases = [
            ("tool.tar.gz", ArchiveFormat::Tar(TarCompression::Gzip)),
            ("tool.tgz", ArchiveFormat::Tar(TarCompression::Gzip)),
            ("tool.tar.bz2", ArchiveFormat::Tar(TarCompression::Bzip2)),
            ("tool.tar.xz", ArchiveFormat::Tar(TarCompression::Xz)),
            ("tool.tar", ArchiveFormat::Tar(TarCompression::None)),
            ("tool.zip", ArchiveFormat::Zip),
            ("tool_1.0_amd64.deb", ArchiveFormat::Ar),
            ("tool.gz", ArchiveFormat::Gzip),
        ];
        for (name, expected) in cases {
            assert_eq!(ArchiveFormat::detect(name).expect(name), expected, "{name}");
        }
    }

    #[test]
    fn detect_ignores_case_and_directories() {
        assert_eq!(
            ArchiveFormat::detect("some/dir/Tool-1.0.TAR.GZ").expect("Should detect"),
            ArchiveFormat::Tar(TarCompression::Gzip)
        );
    }

    #[test]
    fn detect_uses_final_zip_extension() {
        assert_eq!(
            ArchiveFormat::detect("app.zip").expect("Should detect"),
            ArchiveFormat::Zip
        );
        assert!(ArchiveFormat::detect("app.zip.sha256").is_err());
    }

    #[test]
    fn detect_rejects_unsupported_suffix() {
        let err = ArchiveFormat::detect("tool.rar").expect_err("Should reject");
        assert!(matches!(err, PullError::Extraction { .. }));
        assert!(err.to_string().contains("tool.rar"));
        assert!(ArchiveHandle::new("jq-linux-amd64", Vec::new()).is_err());
    }

    #[test]
    fn tar_gz_lists_regular_files_and_extracts() {
        let data = tar_bytes(GzEncoder::new(Vec::new(), Compression::default()))
            .finish()
            .expect("Should finish gzip");
        let handle = ArchiveHandle::new("tool.tar.gz", data).expect("Should open");
        assert_lists_and_extracts(&handle);
    }

    #[test]
    fn tar_bz2_lists_and_extracts() {
        let data = tar_bytes(bzip2::write::BzEncoder::new(
            Vec::new(),
            bzip2::Compression::default(),
        ))
        .finish()
        .expect("Should finish bzip2");
        let handle = ArchiveHandle::new("tool.tar.bz2", data).expect("Should open");
        assert_lists_and_extracts(&handle);
    }

    #[test]
    fn tar_xz_lists_and_extracts() {
        let handle = ArchiveHandle::new("tool.tar.xz", xz_tar_bytes()).expect("Should open");
        assert_lists_and_extracts(&handle);
    }

    #[test]
    fn plain_tar_lists_and_extracts() {
        let handle = ArchiveHandle::new("tool.tar", tar_bytes(Vec::new())).expect("Should open");
        assert_lists_and_extracts(&handle);
    }

    #[test]
    fn zip_skips_directories_and_extracts() {
        let handle = ArchiveHandle::new("tool.zip", zip_bytes()).expect("Should open");
        assert_lists_and_extracts(&handle);
    }

    #[test]
    fn ar_extracts_named_member_not_last() {
        let data = ar_bytes(&[
            ("debian-binary", b"2.0\n"),
            ("dir/file.txt", CONTENT),
            ("data.tar.xz", b"not really xz"),
        ]);
        let handle = ArchiveHandle::new("tool_1.0_amd64.deb", data).expect("Should open");
        assert_eq!(
            handle.members().expect("Should list"),
            ["debian-binary", "dir/file.txt", "data.tar.xz"]
        );
        assert_eq!(handle.extract("dir/file.txt").expect("Should extract"), CONTENT);
        assert_eq!(handle.extract("debian-binary").expect("Should extract"), b"2.0\n");
    }

    #[test]
    fn gzip_has_single_synthetic_member() {
        let handle = ArchiveHandle::new(
            "rust-analyzer-x86_64-unknown-linux-gnu.gz",
            gzip_bytes(CONTENT),
        )
        .expect("Should open");
        assert_eq!(
            handle.members().expect("Should list"),
            ["rust-analyzer-x86_64-unknown-linux-gnu"]
        );
        assert_eq!(handle.extract("anything").expect("Should extract"), CONTENT);
    }

    #[test]
    fn nested_deb_data_tarball() {
        let deb = ar_bytes(&[
            ("debian-binary", b"2.0\n"),
            ("control.tar.xz", b""),
            ("data.tar.xz", &xz_tar_bytes()),
        ]);
        let outer = ArchiveHandle::new("tool_1.0_amd64.deb", deb).expect("Should open deb");
        let inner_bytes = outer.extract("data.tar.xz").expect("Should extract data");
        let inner = ArchiveHandle::new("data.tar.xz", inner_bytes).expect("Should open data");
        assert_lists_and_extracts(&inner);
    }

    #[test]
    fn missing_member_is_extraction_error() {
        let handle = ArchiveHandle::new("tool.tar", tar_bytes(Vec::new())).expect("Should open");
        let err = handle.extract("dir/absent").expect_err("Should fail");
        assert!(matches!(err, PullError::Extraction { .. }));
        assert!(err.to_string().contains("dir/absent"));

        let handle = ArchiveHandle::new("tool.zip", zip_bytes()).expect("Should open");
        assert!(handle.extract("dir/").is_err());
    }

    #[test]
    fn corrupt_archive_is_extraction_error() {
        let handle =
            ArchiveHandle::new("tool.tar.gz", b"definitely not gzip".to_vec()).expect("Should open");
        assert!(matches!(
            handle.members(),
            Err(PullError::Extraction { .. })
        ));
        let handle = ArchiveHandle::new("tool.zip", b"PK garbage".to_vec()).expect("Should open");
        assert!(handle.members().is_err());
    }

    #[test]
    fn find_by_base_name_matches_last_component() {
        let handle = ArchiveHandle::new("tool.tar", tar_bytes(Vec::new())).expect("Should open");
        assert_eq!(
            handle.find_by_base_name("file.txt").expect("Should list"),
            Some("dir/file.txt")
        );
        assert_eq!(handle.find_by_base_name("dir").expect("Should list"), None);
    }
}
