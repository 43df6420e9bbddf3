use std::path::Path;

use tree_sitter::Language;

/// Language-dependent settings to influence how merging is done.
///
/// Only the host language (Java) is supported by the semistructured path;
/// files of any other language fall through to line-based merging.
#[derive(Debug, Clone)]
pub struct LangProfile {
    /// a name that identifies the language
    pub name: &'static str,
    /// the file extensions of files in this language
    pub extensions: Vec<&'static str>,
    /// tree-sitter parser
    pub language: Language,
}

impl LangProfile {
    pub fn java() -> Self {
        Self {
            name: "Java",
            extensions: vec![".java"],
            language: tree_sitter_java::LANGUAGE.into(),
        }
    }

    /// Detects the language of a file based on its filename.
    pub fn detect_from_filename(filename: &Path) -> Option<Self> {
        let filename = filename.to_string_lossy();
        supported_languages().into_iter().find(|lang_profile| {
            lang_profile.extensions.iter().any(|extension| filename.ends_with(extension))
        })
    }
}

/// Returns the list of supported language profiles.
pub fn supported_languages() -> Vec<LangProfile> {
    vec![LangProfile::java()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_by_extension() {
        assert_eq!(LangProfile::detect_from_filename(Path::new("Foo.java")).map(|p| p.name), Some("Java"));
        assert_eq!(LangProfile::detect_from_filename(Path::new("foo.rs")).map(|p| p.name), None);
        assert_eq!(LangProfile::detect_from_filename(Path::new("java")).map(|p| p.name), None);
    }
}
