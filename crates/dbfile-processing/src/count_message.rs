//! Text of the "too many files" validation message.

use dbfile_core::template::format_positional;

/// Used when `ErrorUploadFileAttachmentCount` is not configured.
pub const DEFAULT_COUNT_MESSAGE: &str = "You can only attach {0} {1}.";

/// The maximum as shown to users: 1 and 6 are spelled out, anything else is a numeral.
pub fn max_files_in_words(max_files: usize) -> String {
    match max_files {
        1 => "one".to_string(),
        6 => "six".to_string(),
        n => n.to_string(),
    }
}

/// Format the count message with `{0}` = maximum and `{1}` = attachment reference,
/// pluralized with a trailing "s" when more than one file is allowed.
pub fn file_count_message(template: Option<&str>, max_files: usize, reference: &str) -> String {
    let mut reference = reference.to_string();
    if max_files > 1 {
        reference.push('s');
    }
    format_positional(
        template.unwrap_or(DEFAULT_COUNT_MESSAGE),
        &[&max_files_in_words(max_files), &reference],
    )
}
