use std::io::{ Cursor, Read };

use quick_xml::events::{ BytesStart, Event };
use quick_xml::Reader;
use zip::ZipArchive;

use crate::error::NoticeError;

// A nuspec is a few kilobytes; anything near this is not a real manifest
const MAX_NUSPEC_SIZE: u64 = 5 * 1024 * 1024;

/// The parts of a `.nuspec` the notices pipeline cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NuspecMetadata {
    pub license: String,
    pub project_url: String,
    pub repository_url: String,
}

impl NuspecMetadata {
    /// Read the nuspec out of an in-memory `.nupkg` archive.
    pub fn from_nupkg(content: &[u8]) -> Result<Self, NoticeError> {
        let mut archive = ZipArchive::new(Cursor::new(content)).map_err(|e|
            NoticeError::Archive(format!("Failed to read ZIP archive: {}", e))
        )?;

        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| NoticeError::Archive(format!("Failed to read ZIP entry: {}", e)))?;

            // The package manifest always sits at the archive root
            let name = entry.name().to_string();
            if name.contains('/') || !name.to_lowercase().ends_with(".nuspec") {
                continue;
            }

            if entry.size() > MAX_NUSPEC_SIZE {
                return Err(
                    NoticeError::Archive(format!("{} too large: {} bytes", name, entry.size()))
                );
            }

            let mut xml = String::new();
            entry
                .read_to_string(&mut xml)
                .map_err(|e| NoticeError::Archive(format!("Failed to read {}: {}", name, e)))?;

            return Self::from_nuspec(&xml);
        }

        Err(NoticeError::Archive("No .nuspec file found in archive".to_string()))
    }

    /// Parse nuspec XML. Only direct children of `<metadata>` are read, so
    /// dependency groups and framework assemblies never leak into the result.
    pub fn from_nuspec(xml: &str) -> Result<Self, NoticeError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut metadata = NuspecMetadata::default();
        let mut path: Vec<String> = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let tag = local_name(&e);
                    if in_metadata(&path) && tag == "repository" {
                        metadata.read_repository(&e);
                    }
                    path.push(tag);
                }
                Ok(Event::Empty(e)) => {
                    if in_metadata(&path) && local_name(&e) == "repository" {
                        metadata.read_repository(&e);
                    }
                }
                Ok(Event::Text(e)) => {
                    if path.len() != 3 || path[1] != "metadata" {
                        continue;
                    }
                    let text = e
                        .unescape()
                        .map_err(|e| NoticeError::Archive(format!("XML parsing error: {}", e)))?
                        .trim()
                        .to_string();
                    match path[2].as_str() {
                        "license" => metadata.license = text,
                        "projectUrl" => metadata.project_url = text,
                        _ => {}
                    }
                }
                Ok(Event::End(_)) => {
                    path.pop();
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(NoticeError::Archive(format!("XML parsing error: {}", e)));
                }
                _ => {}
            }
        }

        Ok(metadata)
    }

    fn read_repository(&mut self, element: &BytesStart) {
        for attr in element.attributes().filter_map(|a| a.ok()) {
            if attr.key.local_name().as_ref() == b"url" {
                if let Ok(value) = attr.unescape_value() {
                    self.repository_url = value.trim().to_string();
                }
            }
        }
    }
}

fn local_name(element: &BytesStart) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).to_string()
}

fn in_metadata(path: &[String]) -> bool {
    path.len() == 2 && path[1] == "metadata"
}

/// Build a `.nupkg` in memory holding the given nuspec.
#[cfg(test)]
pub(crate) fn build_nupkg(nuspec_name: &str, nuspec: &str) -> Vec<u8> {
    use std::io::Write;
    use zip::write::FileOptions;

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer.start_file("_rels/.rels", FileOptions::default()).unwrap();
    writer.write_all(b"<Relationships />").unwrap();
    writer.start_file(nuspec_name, FileOptions::default()).unwrap();
    writer.write_all(nuspec.as_bytes()).unwrap();
    writer.start_file("lib/net8.0/readme.nuspec", FileOptions::default()).unwrap();
    writer.write_all(b"<not-the-manifest/>").unwrap();
    writer.finish().unwrap().into_inner()
}
