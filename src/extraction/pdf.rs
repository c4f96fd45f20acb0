use lopdf::{Document, Object};
use std::path::Path;

use super::{
    DocumentInfo, ExtractedPaper, ExtractionError, PaperSource, clean_text, extract_metadata,
};

/// Extracts cleaned text and metadata from PDF files.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl PdfExtractor {
    /// Create an extractor.
    pub const fn new() -> Self {
        Self
    }

    /// Read and extract the PDF at `path`.
    pub fn extract_file(&self, path: &Path) -> Result<ExtractedPaper, ExtractionError> {
        if !path.exists() {
            return Err(ExtractionError::NotFound(path.to_path_buf()));
        }
        tracing::info!(path = %path.display(), "Extracting text from PDF");
        let bytes = std::fs::read(path).map_err(|source| ExtractionError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let stem = path.file_stem().map(|stem| stem.to_string_lossy());
        self.extract_bytes(&bytes, &name, stem.as_deref())
    }

    /// Extract a PDF already loaded in memory.
    ///
    /// `name` only labels errors and logs; `file_stem` feeds the arXiv identifier fallback.
    pub fn extract_bytes(
        &self,
        bytes: &[u8],
        name: &str,
        file_stem: Option<&str>,
    ) -> Result<ExtractedPaper, ExtractionError> {
        // The parser panics on some malformed inputs.
        let message = match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
            Ok(Ok(raw)) => Ok(raw),
            Ok(Err(error)) => Err(error.to_string()),
            Err(_) => Err("parser panicked on malformed input".to_string()),
        };
        let raw = message.map_err(|message| {
            tracing::error!(name, error = %message, "PDF parser rejected document");
            ExtractionError::Parse {
                name: name.to_string(),
                message,
            }
        })?;

        let text = clean_text(&raw);
        if text.is_empty() {
            return Err(ExtractionError::NoText(name.to_string()));
        }

        let info = read_document_info(bytes);
        let metadata = extract_metadata(&text, &info, file_stem);
        tracing::info!(
            name,
            chars = text.chars().count(),
            title = ?metadata.title,
            arxiv_id = ?metadata.arxiv_id,
            authors = metadata.authors.len(),
            "Extraction completed"
        );

        Ok(ExtractedPaper { text, metadata })
    }
}

impl PaperSource for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedPaper, ExtractionError> {
        self.extract_file(path)
    }
}

/// Read `/Title` and `/Author` from the document information dictionary.
///
/// Any failure (unparseable file, encrypted trailer, missing dictionary) yields empty info.
pub fn read_document_info(bytes: &[u8]) -> DocumentInfo {
    let document = match Document::load_mem(bytes) {
        Ok(document) => document,
        Err(error) => {
            tracing::debug!(error = %error, "Document info unavailable");
            return DocumentInfo::default();
        }
    };

    let info = match document.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => document.get_dictionary(*id).ok(),
        Ok(Object::Dictionary(dictionary)) => Some(dictionary),
        _ => None,
    };
    let Some(info) = info else {
        return DocumentInfo::default();
    };

    let field = |key: &[u8]| -> Option<String> {
        let Ok(Object::String(bytes, _)) = info.get(key) else {
            return None;
        };
        let value = decode_pdf_string(bytes);
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    };

    DocumentInfo {
        title: field(b"Title"),
        author: field(b"Author"),
    }
}

/// Decode a PDF text string: UTF-16BE when it carries a byte-order mark, otherwise UTF-8 with a
/// Latin-1 fallback.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&byte| char::from(byte)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Stream, dictionary};

    fn build_pdf(lines: &[&str], info: Option<(&str, &str)>) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 760.into()]),
        ];
        for (index, line) in lines.iter().enumerate() {
            if index > 0 {
                operations.push(Operation::new("Td", vec![0.into(), (-24).into()]));
            }
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        }
        operations.push(Operation::new("ET", vec![]));
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        if let Some((title, author)) = info {
            let info_id = doc.add_object(dictionary! {
                "Title" => Object::string_literal(title),
                "Author" => Object::string_literal(author),
            });
            doc.trailer.set("Info", info_id);
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn reads_document_info_dictionary() {
        let bytes = build_pdf(
            &["Hello"],
            Some(("Graph Networks", "Ada Lovelace; Alan Turing")),
        );
        let info = read_document_info(&bytes);
        assert_eq!(info.title.as_deref(), Some("Graph Networks"));
        assert_eq!(info.author.as_deref(), Some("Ada Lovelace; Alan Turing"));
    }

    #[test]
    fn missing_info_dictionary_is_empty() {
        let bytes = build_pdf(&["Hello"], None);
        assert_eq!(read_document_info(&bytes), DocumentInfo::default());
        assert_eq!(read_document_info(b"not a pdf"), DocumentInfo::default());
    }

    #[test]
    fn extracts_text_and_metadata_from_generated_pdf() {
        let bytes = build_pdf(
            &["Sparse Graph Networks", "arXiv:2401.01234v1"],
            Some(("Sparse Graph Networks", "Ada Lovelace and Alan Turing")),
        );
        let paper = PdfExtractor::new()
            .extract_bytes(&bytes, "paper.pdf", Some("paper"))
            .expect("extraction");
        assert!(paper.text.contains("Sparse Graph Networks"));
        assert_eq!(paper.metadata.title.as_deref(), Some("Sparse Graph Networks"));
        assert_eq!(paper.metadata.authors, vec!["Ada Lovelace", "Alan Turing"]);
        assert_eq!(paper.metadata.arxiv_id.as_deref(), Some("2401.01234v1"));
    }

    #[test]
    fn corrupt_bytes_are_a_parse_error() {
        let error = PdfExtractor::new()
            .extract_bytes(b"%PDF-1.4 garbage", "broken.pdf", None)
            .unwrap_err();
        assert!(matches!(error, ExtractionError::Parse { name, .. } if name == "broken.pdf"));
    }

    #[test]
    fn blank_page_is_no_text() {
        let bytes = build_pdf(&[], None);
        let error = PdfExtractor::new()
            .extract_bytes(&bytes, "blank.pdf", None)
            .unwrap_err();
        assert!(matches!(error, ExtractionError::NoText(name) if name == "blank.pdf"));
    }

    #[test]
    fn missing_file_is_not_found() {
        let error = PdfExtractor::new()
            .extract_file(Path::new("/definitely/not/here.pdf"))
            .unwrap_err();
        assert!(matches!(error, ExtractionError::NotFound(_)));
    }

    #[test]
    fn decodes_utf16_strings() {
        let bytes = [0xFE, 0xFF, 0x00, 0x4A, 0x00, 0xFC];
        assert_eq!(decode_pdf_string(&bytes), "Jü");
        assert_eq!(decode_pdf_string(&[0x4A, 0xFC]), "Jü");
    }
}
