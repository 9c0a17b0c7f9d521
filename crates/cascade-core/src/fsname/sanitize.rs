//! Filename sanitization.

/// Sanitizes a candidate filename for safe use as a single path component.
///
/// - Replaces `/`, `\`, `:`, `*`, `?`, `"`, `<`, `>`, `|`, NUL and control
///   characters with `_`
/// - Trims leading/trailing spaces and dots
/// - Limits length to 255 bytes (NAME_MAX)
pub fn sanitize_filename(name: &str) -> String {
    const NAME_MAX: usize = 255;
    const ILLEGAL: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c == '\0' || c.is_control() || ILLEGAL.contains(&c) {
            out.push('_');
        } else {
            out.push(c);
        }
    }

    let trimmed = out.trim_matches(|c| c == ' ' || c == '.');

    if trimmed.len() > NAME_MAX {
        let mut take = NAME_MAX;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_illegal_chars() {
        assert_eq!(sanitize_filename("a/b:c*d?e\"f<g>h|i.txt"), "a_b_c_d_e_f_g_h_i.txt");
    }

    #[test]
    fn keeps_spaces_inside() {
        assert_eq!(sanitize_filename("my title (1).xml"), "my title (1).xml");
    }

    #[test]
    fn trims_dots_and_spaces() {
        assert_eq!(sanitize_filename("  .. file.txt .. "), "file.txt");
    }

    #[test]
    fn control_chars() {
        assert_eq!(sanitize_filename("file\x00name\ttab.txt"), "file_name_tab.txt");
    }

    #[test]
    fn long_names_capped_on_char_boundary() {
        let long = "é".repeat(200);
        let out = sanitize_filename(&long);
        assert!(out.len() <= 255);
        assert!(out.is_char_boundary(out.len()));
    }
}
