//! Generated settings file (`config.ini`) read by the downstream pipeline.

use crate::domain::{Placeholders, Section, SettingEntry};
use crate::error::InstallResult;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

/// Section → key → value, rendered in section order with sorted keys
#[derive(Debug, Clone, Default)]
pub struct SettingsFile {
    sections: BTreeMap<Section, BTreeMap<String, String>>,
}

impl SettingsFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, expanding placeholders in its value. Later entries win.
    pub fn insert(&mut self, entry: &SettingEntry, vars: &Placeholders) -> InstallResult<()> {
        let value = vars.expand(&entry.value)?;
        self.sections
            .entry(entry.section)
            .or_default()
            .insert(entry.key.clone(), value);
        Ok(())
    }

    pub fn extend<'a, I>(&mut self, entries: I, vars: &Placeholders) -> InstallResult<()>
    where
        I: IntoIterator<Item = &'a SettingEntry>,
    {
        for entry in entries {
            self.insert(entry, vars)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.sections.values().all(BTreeMap::is_empty)
    }

    /// Render as INI text
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (section, entries) in &self.sections {
            if entries.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push('\n');
            }
            let _ = writeln!(out, "[{}]", section.header());
            for (key, value) in entries {
                let _ = writeln!(out, "{} = {}", key, value);
            }
        }
        out
    }

    /// Write the rendered file, replacing any previous one
    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render())
    }
}
