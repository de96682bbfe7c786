// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Severity drives how the UI presents the notice.

use crate::error::HeftwerkError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Trying the same thing again may work.
    Transient,
    /// User must do something (pick another file, free disk space).
    ActionRequired,
    /// This input will never work.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Severity level (drives icon/colour in UI).
    pub severity: Severity,
}

impl HumanError {
    /// Message and suggestion on one line, for status banners.
    pub fn one_line(&self) -> String {
        format!("{} {}", self.message, self.suggestion)
    }
}

/// Convert a `HeftwerkError` into a `HumanError` a non-technical user can act on.
pub fn humanize_error(err: &HeftwerkError) -> HumanError {
    match err {
        HeftwerkError::UnsupportedDocument(detail) => HumanError {
            message: "This type of file can't be merged.".into(),
            suggestion: format!("Only PDF, JPEG and PNG files are supported. ({detail})"),
            severity: Severity::Permanent,
        },

        HeftwerkError::PdfError(_) => HumanError {
            message: "There's a problem with this PDF file.".into(),
            suggestion: "The file may be damaged. Try opening it in another viewer first, or try a different file.".into(),
            severity: Severity::Permanent,
        },

        HeftwerkError::ImageError(_) | HeftwerkError::Conversion(_) => HumanError {
            message: "This image couldn't be turned into a PDF page.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try saving it as a JPEG or PNG again.".into(),
            severity: Severity::Permanent,
        },

        HeftwerkError::Render(_) => HumanError {
            message: "The page preview couldn't be drawn.".into(),
            suggestion: "The document can still be merged. The preview may work after a restart.".into(),
            severity: Severity::Transient,
        },

        HeftwerkError::PageOutOfRange { total, .. } => HumanError {
            message: "That page doesn't exist.".into(),
            suggestion: format!("Choose a page between 1 and {total}."),
            severity: Severity::ActionRequired,
        },

        HeftwerkError::Merge { name, .. } => HumanError {
            message: "The PDFs couldn't be merged.".into(),
            suggestion: format!("\"{name}\" could not be added. Remove it from the list and try again."),
            severity: Severity::ActionRequired,
        },

        HeftwerkError::UnknownDocument(name) => HumanError {
            message: "That file is no longer in the list.".into(),
            suggestion: format!("\"{name}\" may have been removed already. Upload it again if you still need it."),
            severity: Severity::ActionRequired,
        },

        HeftwerkError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "A temporary file went missing.".into(),
                    suggestion: "Remove the file from the list and upload it again.".into(),
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "The app isn't allowed to write its temporary files.".into(),
                    suggestion: "Check the permissions of your temporary folder, or choose another one in Settings.".into(),
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, your disk may be full.".into(),
                    severity: Severity::Transient,
                }
            }
        }

        HeftwerkError::Serialization(_) => HumanError {
            message: "The settings file couldn't be read or written.".into(),
            suggestion: "Your settings were reset to the defaults. Save them again from Settings.".into(),
            severity: Severity::Transient,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_format_is_permanent() {
        let err = HeftwerkError::UnsupportedDocument("application/msword".into());
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::Permanent);
        assert!(human.suggestion.contains("application/msword"));
    }

    #[test]
    fn merge_failure_names_the_file() {
        let err = HeftwerkError::Merge {
            index: 2,
            name: "broken.pdf".into(),
            detail: "invalid xref".into(),
        };
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.suggestion.contains("broken.pdf"));
    }

    #[test]
    fn missing_temp_file_is_action_required() {
        let err = HeftwerkError::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(humanize_error(&err).severity, Severity::ActionRequired);
    }

    #[test]
    fn other_io_errors_are_transient() {
        let err = HeftwerkError::Io(std::io::Error::other("disk full"));
        assert_eq!(humanize_error(&err).severity, Severity::Transient);
    }
}
