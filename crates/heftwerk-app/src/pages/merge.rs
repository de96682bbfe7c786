// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Merge page: upload files, put them in order, preview pages, merge and save.
// Every interaction runs exactly one session cycle.

use dioxus::prelude::*;

use heftwerk_core::human_errors::humanize_error;
use heftwerk_core::types::{DocumentType, ManagedDocument, UploadedFile};
use heftwerk_session::{Action, Notice, NoticeLevel};

use crate::services::app_services::{AppServices, Thumbnail};
use crate::state::{AppState, moved};

/// Thumbnails shown under the preview.
const THUMBNAIL_LIMIT: usize = 8;

/// Run one cycle against the current upload set and take over its outcome.
fn cycle(mut state: Signal<AppState>, svc: &AppServices, action: Option<Action>) {
    let uploads = state.read().uploads.clone();
    let report = svc.run_cycle(&uploads, action, &mut |_| {});
    state.write().absorb(report, svc);
}

#[component]
pub fn Merge() -> Element {
    let mut state = use_context::<Signal<AppState>>();
    let svc = use_context::<AppServices>();
    let dragging = use_signal(|| Option::<usize>::None);
    let busy = state.read().is_merging();

    let documents = state.read().documents.clone();
    let uploads: Vec<String> = state.read().uploads.iter().map(|f| f.name.clone()).collect();
    let selected = state
        .read()
        .selected
        .as_ref()
        .and_then(|name| documents.iter().find(|doc| &doc.name == name).cloned());
    let count = documents.len();
    let progress_percent = state.read().merge_progress.map(|fraction| fraction * 100.0);
    let merged = state.read().merged.clone();
    let notices: Vec<(String, &str, &str)> = state
        .read()
        .notices
        .iter()
        .map(|notice| {
            let (fg, bg) = notice_colors(notice.level);
            (notice.text.clone(), fg, bg)
        })
        .collect();

    rsx! {
        div {
            h1 { "Merge PDFs" }

            // Upload
            section { style: "margin: 16px 0;",
                h3 { "1. Add Files" }
                button {
                    style: "padding: 12px 24px; border-radius: 8px; border: 1px solid #007aff; color: #007aff; background: white; font-size: 16px;",
                    disabled: busy,
                    onclick: {
                        let svc = svc.clone();
                        move |_| {
                            let Some(paths) = rfd::FileDialog::new()
                                .add_filter("PDFs and images", &DocumentType::UPLOAD_EXTENSIONS)
                                .pick_files()
                            else {
                                return;
                            };

                            let mut picked = Vec::with_capacity(paths.len());
                            for path in paths {
                                let name = path.file_name()
                                    .map(|n| n.to_string_lossy().to_string())
                                    .unwrap_or_else(|| "unknown".into());
                                match std::fs::read(&path) {
                                    Ok(bytes) => {
                                        tracing::info!(file = %name, bytes = bytes.len(), "file picked");
                                        picked.push(UploadedFile::new(name, bytes));
                                    }
                                    Err(e) => {
                                        tracing::error!(error = %e, file = %name, "failed to read file");
                                        state.write().notices.push(Notice::error(format!("Could not read {name}. {e}")));
                                    }
                                }
                            }
                            state.write().add_uploads(picked);
                            cycle(state, &svc, None);
                        }
                    },
                    "Choose Files"
                }
                p { style: "color: #888; font-size: 13px;", "PDF, JPEG or PNG" }

                div { style: "display: flex; flex-wrap: wrap; gap: 6px; margin-top: 8px;",
                    for name in uploads {
                        span {
                            key: "{name}",
                            style: "display: inline-flex; align-items: center; gap: 4px; padding: 4px 8px; border-radius: 12px; background: #f0f0f0; font-size: 13px;",
                            "{name}"
                            button {
                                style: "border: none; background: none; color: #888; cursor: pointer;",
                                disabled: busy,
                                onclick: {
                                    let svc = svc.clone();
                                    let name = name.clone();
                                    move |_| {
                                        state.write().dismiss_upload(&name);
                                        cycle(state, &svc, None);
                                    }
                                },
                                "x"
                            }
                        }
                    }
                }

                label { style: "display: flex; align-items: center; gap: 8px; margin-top: 12px;",
                    input {
                        r#type: "checkbox",
                        checked: state.read().config.preserve_resolution,
                        disabled: busy,
                        onchange: {
                            let svc = svc.clone();
                            move |evt: Event<FormData>| {
                                let preserve = evt.checked();
                                state.write().config.preserve_resolution = preserve;
                                cycle(state, &svc, Some(Action::SetPreserveResolution(preserve)));
                            }
                        },
                    }
                    "Keep images at full resolution"
                }
            }

            // Order
            section { style: "margin: 16px 0;",
                h3 { "2. Order" }
                if documents.is_empty() {
                    p { style: "color: #888;", "No files yet." }
                } else {
                    p { style: "color: #888; font-size: 13px;", "Drag files or use Up and Down. Files are merged top to bottom." }
                    for (index, document) in documents.iter().enumerate() {
                        DocumentRow {
                            key: "{document.name}",
                            document: document.clone(),
                            index,
                            count,
                            dragging,
                        }
                    }
                }
            }

            // Preview
            if let Some(document) = selected {
                section { style: "margin: 16px 0;",
                    h3 { "3. Preview" }
                    PagePreview {
                        name: document.name.clone(),
                        page: document.current_page,
                        page_count: document.page_count,
                    }
                }
            }

            // Merge
            section { style: "margin: 16px 0;",
                button {
                    style: "width: 100%; padding: 16px; border-radius: 12px; border: none; background: #007aff; color: white; font-size: 18px; font-weight: bold;",
                    disabled: count == 0 || busy,
                    onclick: {
                        let svc = svc.clone();
                        move |_| {
                            state.write().merge_progress = Some(0.0);
                            let uploads = state.read().uploads.clone();
                            let svc = svc.clone();

                            spawn(async move {
                                let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<f32>();
                                let handle = svc.spawn_merge(uploads, move |fraction| {
                                    let _ = tx.send(fraction);
                                });
                                while let Some(fraction) = rx.recv().await {
                                    state.write().merge_progress = Some(fraction);
                                }
                                match handle.await {
                                    Ok(report) => state.write().absorb(report, &svc),
                                    Err(e) => {
                                        tracing::error!(error = %e, "merge worker failed");
                                        state.write().notices = vec![Notice::error("The merge stopped unexpectedly. Try again.")];
                                    }
                                }
                                state.write().merge_progress = None;
                            });
                        }
                    },
                    if busy { "Merging..." } else { "Merge PDFs" }
                }

                if let Some(percent) = progress_percent {
                    div { style: "margin-top: 8px; height: 8px; border-radius: 4px; background: #e0e0e0;",
                        div { style: "height: 8px; border-radius: 4px; background: #007aff; width: {percent}%;" }
                    }
                }
            }

            // Download
            if let Some(merged) = merged {
                section { style: "margin: 16px 0; padding: 16px; border-radius: 12px; background: #d4edda;",
                    p { style: "margin: 0 0 8px 0; color: #155724; font-weight: bold;",
                        "{merged.file_name}"
                    }
                    p { style: "margin: 0 0 12px 0; color: #155724; font-size: 14px;",
                        "{merged.page_count} pages, {merged.size_kib()} KiB"
                    }
                    div { style: "display: flex; gap: 8px;",
                        button {
                            style: "padding: 8px 16px; border-radius: 8px; border: none; background: #155724; color: white;",
                            disabled: busy,
                            onclick: {
                                let svc = svc.clone();
                                let file_name = merged.file_name.clone();
                                move |_| {
                                    let Some(path) = rfd::FileDialog::new()
                                        .set_file_name(&file_name)
                                        .add_filter("PDF", &["pdf"])
                                        .save_file()
                                    else {
                                        return;
                                    };
                                    let notice = match svc.save_merged(&path) {
                                        Ok(()) => Notice::success(format!("Saved to {}.", path.display())),
                                        Err(e) => {
                                            tracing::error!(error = %e, "failed to save merged PDF");
                                            Notice::from_error("Save", &e)
                                        }
                                    };
                                    state.write().notices = vec![notice];
                                }
                            },
                            "Save PDF"
                        }
                        button {
                            style: "padding: 8px 16px; border-radius: 8px; border: 1px solid #155724; background: white; color: #155724;",
                            disabled: busy,
                            onclick: {
                                let svc = svc.clone();
                                move |_| cycle(state, &svc, Some(Action::ClearMerged))
                            },
                            "Discard"
                        }
                    }
                }
            }

            // Messages
            for (text, fg, bg) in notices {
                p {
                    style: "margin: 8px 0; padding: 10px 12px; border-radius: 8px; color: {fg}; background: {bg}; font-size: 14px;",
                    "{text}"
                }
            }
        }
    }
}

/// One entry of the merge list.
#[component]
fn DocumentRow(
    document: ManagedDocument,
    index: usize,
    count: usize,
    dragging: Signal<Option<usize>>,
) -> Element {
    let mut dragging = dragging;
    let mut state = use_context::<Signal<AppState>>();
    let svc = use_context::<AppServices>();
    let is_selected = state.read().selected.as_deref() == Some(document.name.as_str());
    let busy = state.read().is_merging();
    let background = if is_selected { "#e7f3ff" } else { "white" };
    let kind = match document.kind {
        DocumentType::Pdf => "PDF",
        DocumentType::Jpeg => "JPEG",
        DocumentType::Png => "PNG",
    };
    let position = index + 1;

    let reorder = {
        let svc = svc.clone();
        move |from: usize, to: usize| {
            let order = moved(&state.read().document_names(), from, to);
            cycle(state, &svc, Some(Action::Reorder(order)));
        }
    };
    let move_up = reorder.clone();
    let move_down = reorder.clone();
    let drop_here = reorder;

    rsx! {
        div {
            style: "display: flex; align-items: center; gap: 8px; padding: 8px 12px; margin: 4px 0; border: 1px solid #e0e0e0; border-radius: 8px; background: {background}; cursor: grab;",
            draggable: if busy { "false" } else { "true" },
            ondragstart: move |_| dragging.set(Some(index)),
            ondragover: move |evt: Event<DragData>| evt.prevent_default(),
            ondrop: move |evt: Event<DragData>| {
                evt.prevent_default();
                if let Some(from) = dragging.take()
                    && from != index
                    && !busy
                {
                    drop_here(from, index);
                }
            },

            span { style: "color: #888; width: 24px;", "{position}." }
            span {
                style: "flex: 1; cursor: pointer;",
                onclick: {
                    let name = document.name.clone();
                    move |_| state.write().selected = Some(name.clone())
                },
                "{document.name}"
            }
            span { style: "color: #888; font-size: 12px;", "{kind}, {document.page_count} p." }
            button {
                disabled: busy || index == 0,
                onclick: move |_| move_up(index, index - 1),
                "Up"
            }
            button {
                disabled: busy || index + 1 >= count,
                onclick: move |_| move_down(index, index + 1),
                "Down"
            }
            button {
                style: "color: #c00;",
                disabled: busy,
                onclick: {
                    let svc = svc.clone();
                    let name = document.name.clone();
                    move |_| {
                        // Also leave the upload set, or the next cycle re-adds it.
                        state.write().dismiss_upload(&name);
                        cycle(state, &svc, Some(Action::Remove(name.clone())));
                    }
                },
                "Remove"
            }
        }
    }
}

/// Current page of a document, page controls and a thumbnail strip.
#[component]
fn PagePreview(name: String, page: u32, page_count: usize) -> Element {
    let state = use_context::<Signal<AppState>>();
    let svc = use_context::<AppServices>();
    let width = state.read().config.viewer_width;

    // Rendering needs the session, which a running merge holds.
    if state.read().is_merging() {
        return rsx! {
            p { style: "color: #888;", "Preview paused while merging." }
        };
    }

    let preview = svc
        .render_current_page(&name)
        .map_err(|e| humanize_error(&e).message);
    let tiles: Vec<(usize, Option<String>, Option<(String, &str, &str)>)> =
        if svc.previews_available() {
            svc.thumbnails(&name, THUMBNAIL_LIMIT)
                .into_iter()
                .enumerate()
                .map(|(index, tile)| match tile {
                    Thumbnail::Ready(url) => (index, Some(url), None),
                    Thumbnail::Failed(notice) => {
                        let (color, background) = notice_colors(notice.level);
                        (index, None, Some((notice.text, color, background)))
                    }
                })
                .collect()
        } else {
            Vec::new()
        };
    let advisory = svc.advisory(&name);

    let navigate = {
        let svc = svc.clone();
        move |action: Action| cycle(state, &svc, Some(action))
    };
    let previous = navigate.clone();
    let next = navigate.clone();
    let jump = navigate.clone();
    let pick = navigate;

    rsx! {
        div {
            if let Some(message) = advisory {
                p { style: "padding: 8px 12px; border-radius: 8px; background: #e7f3ff; color: #004085; font-size: 14px;",
                    "{message}"
                }
            }

            div { style: "display: flex; align-items: center; gap: 8px; margin-bottom: 8px;",
                button {
                    disabled: page <= 1,
                    onclick: {
                        let name = name.clone();
                        move |_| previous(Action::PreviousPage(name.clone()))
                    },
                    "Previous"
                }
                span { "Page" }
                input {
                    r#type: "number",
                    min: "1",
                    max: "{page_count}",
                    value: "{page}",
                    style: "width: 60px; padding: 4px; border: 1px solid #ccc; border-radius: 4px;",
                    onchange: {
                        let name = name.clone();
                        move |evt: Event<FormData>| {
                            if let Ok(page) = evt.value().parse::<u32>() {
                                jump(Action::SetPage { name: name.clone(), page });
                            }
                        }
                    },
                }
                span { "of {page_count}" }
                button {
                    disabled: page as usize >= page_count,
                    onclick: {
                        let name = name.clone();
                        move |_| next(Action::NextPage(name.clone()))
                    },
                    "Next"
                }
            }

            if let Ok(url) = &preview {
                img { src: "{url}", width: "{width}", style: "border: 1px solid #e0e0e0;" }
            }
            if let Err(message) = &preview {
                p { style: "color: #888;", "{message}" }
            }

            div { style: "display: flex; gap: 6px; overflow-x: auto; margin-top: 8px;",
                for (index, url, failure) in tiles {
                    if let Some(url) = url {
                        img {
                            key: "{index}",
                            src: "{url}",
                            style: "height: 96px; cursor: pointer; border: 1px solid #e0e0e0;",
                            onclick: {
                                let name = name.clone();
                                let pick = pick.clone();
                                move |_| pick(Action::SetPage { name: name.clone(), page: index as u32 + 1 })
                            },
                        }
                    }
                    if let Some((text, color, background)) = failure {
                        div {
                            key: "{index}",
                            style: "height: 96px; width: 68px; display: flex; align-items: center; justify-content: center; text-align: center; font-size: 11px; padding: 4px; color: {color}; background: {background}; border: 1px solid #e0e0e0;",
                            "{text}"
                        }
                    }
                }
            }
        }
    }
}

fn notice_colors(level: NoticeLevel) -> (&'static str, &'static str) {
    match level {
        NoticeLevel::Info => ("#004085", "#e7f3ff"),
        NoticeLevel::Success => ("#155724", "#d4edda"),
        NoticeLevel::Warning => ("#856404", "#fff3cd"),
        NoticeLevel::Error => ("#721c24", "#f8d7da"),
    }
}
