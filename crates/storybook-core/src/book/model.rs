//! Book domain model.
//!
//! A storybook is a three-level hierarchy: a [`Book`] owns ordered [`Page`]s,
//! each page owns ordered [`Dialogue`]s. Media fields (cover, background,
//! audio) are URL references; the files behind them belong to the asset
//! storage, never to the book.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Generation status of a book.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BookStatus {
    /// Pages, images or audio are still being generated.
    #[default]
    Process,
    /// Generation finished and every page is usable.
    Success,
    /// Generation failed; the book is kept so the user can see what happened.
    Error,
}

/// What the `background_image` of a page points at.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PageKind {
    #[default]
    Image,
    Video,
}

/// A single narrated line on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialogue {
    #[serde(default = "new_id")]
    pub id: String,
    /// 1-based position within the page.
    pub index: u32,
    pub text: String,
    /// URL of the TTS audio clip for this line, empty if generation failed.
    #[serde(default)]
    pub part_audio_url: String,
}

impl Dialogue {
    pub fn new(index: u32, text: impl Into<String>, part_audio_url: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            index,
            text: text.into(),
            part_audio_url: part_audio_url.into(),
        }
    }
}

/// One illustrated page of a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default = "new_id")]
    pub id: String,
    /// 1-based position within the book.
    pub index: u32,
    #[serde(rename = "type", default)]
    pub kind: PageKind,
    #[serde(default)]
    pub background_image: String,
    /// Still image shown when a video page cannot be played.
    #[serde(default)]
    pub fallback_image: String,
    #[serde(default)]
    pub dialogues: Vec<Dialogue>,
}

impl Page {
    pub fn new(index: u32, background_image: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            index,
            kind: PageKind::Image,
            background_image: background_image.into(),
            fallback_image: String::new(),
            dialogues: Vec::new(),
        }
    }

    /// Appends a dialogue, numbering it after the current last one.
    pub fn push_dialogue(&mut self, text: impl Into<String>, part_audio_url: impl Into<String>) {
        let index = self.dialogues.len() as u32 + 1;
        self.dialogues.push(Dialogue::new(index, text, part_audio_url));
    }

    /// The image to show for this page: the fallback for videos when one
    /// exists, the background otherwise.
    pub fn display_image(&self) -> &str {
        match self.kind {
            PageKind::Video if !self.fallback_image.is_empty() => &self.fallback_image,
            _ => &self.background_image,
        }
    }
}

/// A storybook, persisted as one JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Server-generated identifier; an empty id means "not assigned yet".
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub cover_image: String,
    #[serde(default)]
    pub status: BookStatus,
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default = "now")]
    pub created_at: NaiveDateTime,
}

impl Book {
    /// Creates an empty book in `process` status with a fresh id.
    pub fn new(title: impl Into<String>, cover_image: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            cover_image: cover_image.into(),
            status: BookStatus::Process,
            pages: Vec::new(),
            created_at: now(),
        }
    }

    /// Appends a page, numbering it after the current last one.
    pub fn push_page(&mut self, mut page: Page) {
        page.index = self.pages.len() as u32 + 1;
        self.pages.push(page);
    }

    /// Whether generation has finished, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, BookStatus::Success | BookStatus::Error)
    }

    /// Brings pages and dialogues back to the stored ordering rules.
    ///
    /// Each collection is stably sorted by `index` and renumbered from 1, so
    /// a caller that swaps two indices gets the swap applied consistently.
    /// Missing page/dialogue ids are filled in.
    pub fn normalize(&mut self) {
        self.pages.sort_by_key(|page| page.index);
        for (position, page) in self.pages.iter_mut().enumerate() {
            page.index = position as u32 + 1;
            if page.id.is_empty() {
                page.id = new_id();
            }

            page.dialogues.sort_by_key(|dialogue| dialogue.index);
            for (position, dialogue) in page.dialogues.iter_mut().enumerate() {
                dialogue.index = position as u32 + 1;
                if dialogue.id.is_empty() {
                    dialogue.id = new_id();
                }
            }
        }
    }

    /// Returns true when indices already run 1, 2, 3... in both levels.
    pub fn is_normalized(&self) -> bool {
        self.pages.iter().enumerate().all(|(position, page)| {
            page.index == position as u32 + 1
                && page
                    .dialogues
                    .iter()
                    .enumerate()
                    .all(|(position, dialogue)| dialogue.index == position as u32 + 1)
        })
    }

    /// List projection used by overview screens.
    pub fn summary(&self) -> BookSummary {
        BookSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            cover_image: self.cover_image.clone(),
            status: self.status,
        }
    }
}

/// The fields of a book needed to render a list of books.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSummary {
    pub id: String,
    pub title: String,
    pub cover_image: String,
    pub status: BookStatus,
}

/// Generates a new opaque identifier.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}
