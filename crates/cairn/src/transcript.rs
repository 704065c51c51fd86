// SPDX-FileCopyrightText: 2026 Cairn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcript loading for batch extraction.
//!
//! Two JSON shapes are accepted: a plain array of `{role, text}` turns, or
//! a normalized chat log `{"entries": [{"user": .., "response": ..}, ..]}`.
//! A folder is read as every `normalized_*.json` file in name order.

use std::path::{Path, PathBuf};

use cairn_core::{CairnError, Role};
use cairn_memory::Turn;
use serde::Deserialize;

/// Prefix of injected control blocks that are not real user input.
const CONTROL_PREFIX: &str = "<|BEGIN-";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TranscriptFile {
    Turns(Vec<Turn>),
    Normalized { entries: Vec<NormalizedEntry> },
}

#[derive(Debug, Deserialize)]
struct NormalizedEntry {
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    response: Option<String>,
}

/// One loaded transcript file.
#[derive(Debug)]
pub struct Transcript {
    pub name: String,
    pub turns: Vec<Turn>,
}

/// Load a transcript file, or every normalized transcript in a folder.
pub fn load(path: &Path) -> Result<Vec<Transcript>, CairnError> {
    if !path.is_dir() {
        return Ok(vec![load_file(path)?]);
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(path)
        .map_err(|e| CairnError::Config(format!("cannot read {}: {e}", path.display())))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("normalized_") && n.ends_with(".json"))
        })
        .collect();
    files.sort();
    if files.is_empty() {
        return Err(CairnError::Config(format!(
            "no normalized_*.json files found in {}",
            path.display()
        )));
    }
    files.iter().map(|p| load_file(p)).collect()
}

fn load_file(path: &Path) -> Result<Transcript, CairnError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CairnError::Config(format!("cannot read {}: {e}", path.display())))?;
    Ok(Transcript {
        name: path.display().to_string(),
        turns: parse(&content)
            .map_err(|e| CairnError::Config(format!("invalid transcript {}: {e}", path.display())))?,
    })
}

/// Parse transcript JSON into turns, dropping empty text and control blocks.
pub fn parse(content: &str) -> Result<Vec<Turn>, serde_json::Error> {
    let turns = match serde_json::from_str::<TranscriptFile>(content)? {
        TranscriptFile::Turns(turns) => turns,
        TranscriptFile::Normalized { entries } => entries
            .into_iter()
            .flat_map(|e| {
                let user = e
                    .user
                    .filter(|u| !u.trim().starts_with(CONTROL_PREFIX))
                    .map(|u| Turn::new(Role::User, u));
                let reply = e.response.map(|r| Turn::new(Role::Assistant, r));
                user.into_iter().chain(reply)
            })
            .collect(),
    };
    Ok(turns
        .into_iter()
        .map(|t| Turn::new(t.role, t.text.trim()))
        .filter(|t| !t.text.is_empty())
        .collect())
}
