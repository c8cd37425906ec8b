use rand::{seq::SliceRandom, thread_rng};

pub const WATERMARK_SUFFIX: &str = "-with-watermark";
pub const DEFAULT_RANDOM_SUFFIX_LENGTH: usize = 5;
const EXTENSION_DELIMITER: char = '.';
const PATH_SEPARATORS: [char; 2] = ['/', '\\'];
const SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A filename split on its last extension delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileNameParts<'a> {
    pub stem: &'a str,
    pub extension: Option<&'a str>,
}

impl<'a> FileNameParts<'a> {
    /// Split `filename` on the last `.` of its final path component.
    ///
    /// Dots in leading directories are ignored. A final component without a
    /// delimiter, or whose only delimiter is its first character (`.hidden`),
    /// has no extension.
    pub fn split(filename: &'a str) -> Self {
        let name_start = filename
            .rfind(PATH_SEPARATORS)
            .map_or(0, |index| index + 1);

        match filename[name_start..].rfind(EXTENSION_DELIMITER) {
            Some(dot) if dot > 0 => {
                let split = name_start + dot;
                Self {
                    stem: &filename[..split],
                    extension: Some(&filename[split + 1..]),
                }
            }
            _ => Self {
                stem: filename,
                extension: None,
            },
        }
    }

    fn join(&self, infix: &str) -> String {
        match self.extension {
            Some(extension) => format!("{}{infix}{EXTENSION_DELIMITER}{extension}", self.stem),
            None => format!("{}{infix}", self.stem),
        }
    }
}

/// Map `name.ext` to `name-with-watermark.ext`.
///
/// Not idempotent: feeding the result back in appends the suffix again.
pub fn derive_output_name(filename: &str) -> String {
    FileNameParts::split(filename).join(WATERMARK_SUFFIX)
}

/// Like [`derive_output_name`] with a random token after the suffix, so
/// repeated runs on the same input do not overwrite each other.
pub fn derive_unique_output_name(filename: &str) -> String {
    let token = unique_suffix(DEFAULT_RANDOM_SUFFIX_LENGTH);
    FileNameParts::split(filename).join(&format!("{WATERMARK_SUFFIX}-{token}"))
}

fn unique_suffix(length: usize) -> String {
    debug_assert!(length <= SUFFIX_ALPHABET.len());
    let mut rng = thread_rng();
    SUFFIX_ALPHABET
        .choose_multiple(&mut rng, length)
        .copied()
        .map(char::from)
        .collect()
}

pub fn trimmed_or_none(input: Option<&str>) -> Option<&str> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}
