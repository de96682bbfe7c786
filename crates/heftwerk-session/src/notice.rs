// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// User-visible messages produced by a session cycle.

use heftwerk_core::error::HeftwerkError;
use heftwerk_core::human_errors::humanize_error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// One message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, text)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, text)
    }

    /// Shown in place of a thumbnail that could not be rendered. `page` is
    /// 1-based.
    pub fn preview_failed(page: usize) -> Self {
        Self::error(format!("Page {page} preview failed."))
    }

    /// Describe `err` for the user, prefixed with what it concerns.
    ///
    /// Rejected file types are warnings; everything else is an error.
    pub fn from_error(subject: &str, err: &HeftwerkError) -> Self {
        let level = match err {
            HeftwerkError::UnsupportedDocument(_) => NoticeLevel::Warning,
            _ => NoticeLevel::Error,
        };
        Self::new(level, format!("{subject}: {}", humanize_error(err).one_line()))
    }

    fn new(level: NoticeLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

/// Everything a cycle wants to tell the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub notices: Vec<Notice>,
    /// A new merged artifact was produced this cycle.
    pub merged: bool,
}

impl CycleReport {
    pub fn push(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    pub fn has_errors(&self) -> bool {
        self.notices
            .iter()
            .any(|notice| notice.level == NoticeLevel::Error)
    }

    /// Notices at exactly `level`.
    pub fn at(&self, level: NoticeLevel) -> impl Iterator<Item = &Notice> {
        self.notices
            .iter()
            .filter(move |notice| notice.level == level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_files_are_warnings() {
        let notice = Notice::from_error(
            "notes.docx",
            &HeftwerkError::UnsupportedDocument("notes.docx".into()),
        );
        assert_eq!(notice.level, NoticeLevel::Warning);
        assert!(notice.text.starts_with("notes.docx: "));
    }

    #[test]
    fn failed_preview_names_the_page() {
        let notice = Notice::preview_failed(3);
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.text, "Page 3 preview failed.");
    }

    #[test]
    fn other_failures_are_errors() {
        let notice = Notice::from_error("scan.png", &HeftwerkError::ImageError("truncated".into()));
        assert_eq!(notice.level, NoticeLevel::Error);

        let mut report = CycleReport::default();
        assert!(!report.has_errors());
        report.push(Notice::info("hello"));
        report.push(notice);
        assert!(report.has_errors());
        assert_eq!(report.at(NoticeLevel::Info).count(), 1);
    }
}
