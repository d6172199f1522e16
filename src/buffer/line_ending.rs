//! Line-ending normalization policy (§3, §4.2, §9).

/// A buffer's preferred line terminator. Incoming text on every write is
/// normalized to this terminator regardless of what it originally used —
/// the full CR/LF/CRLF cross-product collapses to whichever one variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LineEnding {
    #[default]
    Lf,
    Crlf,
    Cr,
}

impl LineEnding {
    fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
            LineEnding::Cr => "\r",
        }
    }

    /// Rewrites every CRLF/CR/LF terminator in `text` to this ending.
    pub fn normalize(self, text: &str) -> String {
        let target = self.as_str();
        let mut out = String::with_capacity(text.len());
        let bytes = text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                    out.push_str(target);
                    i += 2;
                }
                b'\r' => {
                    out.push_str(target);
                    i += 1;
                }
                b'\n' => {
                    out.push_str(target);
                    i += 1;
                }
                _ => {
                    // Copy the run of non-terminator bytes in one shot.
                    let start = i;
                    while i < bytes.len() && bytes[i] != b'\r' && bytes[i] != b'\n' {
                        i += 1;
                    }
                    out.push_str(&text[start..i]);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_every_variant_to_lf() {
        let text = "a\r\nb\nc\rd";
        assert_eq!(LineEnding::Lf.normalize(text), "a\nb\nc\nd");
    }

    #[test]
    fn normalizes_to_crlf() {
        let text = "a\nb\r\nc\rd";
        assert_eq!(LineEnding::Crlf.normalize(text), "a\r\nb\r\nc\r\nd");
    }

    #[test]
    fn normalizes_to_cr() {
        let text = "a\nb\r\nc";
        assert_eq!(LineEnding::Cr.normalize(text), "a\rb\rc");
    }

    #[test]
    fn text_without_terminators_is_untouched() {
        assert_eq!(LineEnding::Crlf.normalize("hello world"), "hello world");
    }
}
