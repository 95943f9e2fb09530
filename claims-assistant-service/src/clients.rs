//! Flat-file client directory.
//!
//! Client records live in a small CSV table (`Id,Name,Surname,Address,
//! Country,Tier,Policy Number`). The whole table is loaded at startup and
//! lookups are linear scans; the directory is a few hundred rows at most.

use anyhow::{Context as _, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id: u32,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub country: String,
    pub tier: String,
    pub policy_number: String,
}

impl ClientRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Default)]
pub struct ClientDirectory {
    records: Vec<ClientRecord>,
}

impl ClientDirectory {
    pub fn new(records: Vec<ClientRecord>) -> Self {
        Self { records }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read client table at {}", path.display()))?;
        let directory = Self::parse(&raw)?;
        info!(
            path = %path.display(),
            clients = directory.len(),
            "Loaded client directory"
        );
        Ok(directory)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let mut lines = raw.lines().filter(|l| !l.trim().is_empty());
        let Some(header) = lines.next() else {
            bail!("Client table is empty");
        };
        let expected = "Id,Name,Surname,Address,Country,Tier,Policy Number";
        if header.trim() != expected {
            bail!("Unexpected client table header: {header}");
        }

        let mut records = Vec::new();
        for (line_no, line) in lines.enumerate() {
            let fields = split_csv_line(line);
            if fields.len() != 7 {
                bail!(
                    "Malformed client row {} ({} fields, expected 7)",
                    line_no + 2,
                    fields.len()
                );
            }
            records.push(ClientRecord {
                id: fields[0]
                    .trim()
                    .parse()
                    .with_context(|| format!("Bad client id on row {}", line_no + 2))?,
                first_name: fields[1].trim().to_string(),
                last_name: fields[2].trim().to_string(),
                address: fields[3].trim().to_string(),
                country: fields[4].trim().to_string(),
                tier: fields[5].trim().to_string(),
                policy_number: fields[6].trim().to_string(),
            });
        }
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Exact policy-number match, trimmed and case-insensitive.
    pub fn find_by_policy(&self, policy_number: &str) -> Option<&ClientRecord> {
        let wanted = policy_number.trim().to_uppercase();
        self.records
            .iter()
            .find(|r| r.policy_number.trim().to_uppercase() == wanted)
    }

    /// Case-insensitive substring match against first or last name.
    pub fn find_by_name(&self, name: &str) -> Vec<&ClientRecord> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.records
            .iter()
            .filter(|r| {
                r.first_name.to_lowercase().contains(&needle)
                    || r.last_name.to_lowercase().contains(&needle)
            })
            .collect()
    }
}

/// Split one CSV line, honoring double-quoted fields (addresses contain
/// commas) and doubled quotes inside them.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
