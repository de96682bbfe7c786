// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer: bridges the Dioxus UI to the heftwerk backend crates.
//
// The UI never touches a `Session` directly; it goes through `AppServices`,
// which serialises access and turns results into data the pages can display.

pub mod app_services;
pub mod data_dir;
pub mod viewer;
