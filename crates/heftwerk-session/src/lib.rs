// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// heftwerk-session: per-user session state for Heftwerk.
//
// A `Session` owns the ordered document list, the page each document is
// showing, the last merged artifact and a private temp directory. The UI
// drives it one interaction at a time through `Session::run_cycle`.

pub mod lifecycle;
pub mod navigator;
pub mod notice;
pub mod session;
pub mod store;

pub use lifecycle::TempRegistry;
pub use navigator::{PageNavigator, PageViewer, advisory};
pub use notice::{CycleReport, Notice, NoticeLevel};
pub use session::{Action, Session};
pub use store::{Added, FileStore};
