use crate::entities::character::{
    CharacterRecord, NO_CLAN, PLR_CRYO, PLR_DELETED, PLR_FROZEN, PLR_NODELETE, PLR_NOWIZLIST,
};
use crate::entities::flags::ascii_to_word;
use crate::persistence::atomic_io::write_atomic;
use crate::persistence::error::{PersistenceError, PersistenceResult};
use crate::persistence::paths::validate_name;
use crate::persistence::tagged_line::LineReader;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const PINDEX_DELETED: u32 = 1 << 0;
pub const PINDEX_NODELETE: u32 = 1 << 1;
pub const PINDEX_NOWIZLIST: u32 = 1 << 3;

const RECORD_SYNCED_FLAGS: u32 = PINDEX_DELETED | PINDEX_NODELETE | PINDEX_NOWIZLIST;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub name: String,
    pub id: i64,
    pub level: i32,
    pub flags: u32,
    pub last_login: i64,
    pub clan: i32,
}

impl IndexEntry {
    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    /// Tries `id name level flags last clan`, then the older layout without
    /// the clan column.
    fn parse(line: &str) -> Option<Self> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() >= 6 {
            if let Some(entry) = Self::parse_fields(&tokens[..5], Some(tokens[5])) {
                return Some(entry);
            }
        }
        if tokens.len() >= 5 {
            return Self::parse_fields(&tokens[..5], None);
        }
        None
    }

    fn parse_fields(fields: &[&str], clan: Option<&str>) -> Option<Self> {
        let clan = match clan {
            Some(value) => value.parse().ok()?,
            None => NO_CLAN,
        };
        validate_name(fields[1]).ok()?;
        Some(Self {
            id: fields[0].parse().ok()?,
            name: fields[1].to_lowercase(),
            level: fields[2].parse().ok()?,
            flags: parse_index_flags(fields[3]),
            last_login: fields[4].parse().ok()?,
            clan,
        })
    }

    fn to_line(&self) -> String {
        let line = format!(
            "{} {} {} {:#x} {}",
            self.id, self.name, self.level, self.flags, self.last_login
        );
        if self.clan == NO_CLAN {
            line
        } else {
            format!("{} {}", line, self.clan)
        }
    }
}

/// Hex with a `0x` prefix, otherwise letter flags or a plain decimal word.
fn parse_index_flags(token: &str) -> u32 {
    match token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16).unwrap_or(0),
        None => ascii_to_word(token),
    }
}

/// Name/id table over every stored character, backed by the index file.
/// Entry positions are stable for the life of a character; removals shift
/// later entries down.
#[derive(Debug)]
pub struct PlayerIndex {
    path: PathBuf,
    entries: Vec<IndexEntry>,
    top_id: i64,
}

impl PlayerIndex {
    pub fn init(path: impl Into<PathBuf>) -> PersistenceResult<Self> {
        let index = Self::build(path)?;
        info!(
            path = %index.path.display(),
            entries = index.entries.len(),
            top_id = index.top_id,
            "player index loaded"
        );
        Ok(index)
    }

    pub fn teardown(self) {
        info!(path = %self.path.display(), entries = self.entries.len(), "player index released");
    }

    /// Reads the index file. A missing file is an empty index, not an error.
    pub fn build(path: impl Into<PathBuf>) -> PersistenceResult<Self> {
        let path = path.into();
        match fs::read_to_string(&path) {
            Ok(data) => Ok(Self::parse(path, &data)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "no player index file, starting empty");
                Ok(Self::empty(path))
            }
            Err(source) => Err(PersistenceError::FileOpen { path, source }),
        }
    }

    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
            top_id: 0,
        }
    }

    fn parse(path: PathBuf, data: &str) -> Self {
        let mut index = Self::empty(path);
        let mut reader = LineReader::new(data);
        while let Some(line) = reader.next_line() {
            if line.starts_with('~') {
                break;
            }
            let Some(entry) = IndexEntry::parse(line) else {
                warn!(
                    path = %index.path.display(),
                    line_number = reader.line_number(),
                    line,
                    "invalid player index line skipped"
                );
                continue;
            };
            if index.find_by_name(&entry.name).is_some() {
                warn!(path = %index.path.display(), name = %entry.name, "duplicate index entry skipped");
                continue;
            }
            index.top_id = index.top_id.max(entry.id);
            index.entries.push(entry);
        }
        index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn entry(&self, position: usize) -> Option<&IndexEntry> {
        self.entries.get(position)
    }

    pub fn top_id(&self) -> i64 {
        self.top_id
    }

    /// Hands out the next id. Ids are never reused, even after removals.
    pub fn allocate_id(&mut self) -> i64 {
        self.top_id += 1;
        self.top_id
    }

    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    pub fn find_by_id(&self, id: i64) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    pub fn find_name_by_id(&self, id: i64) -> Option<&str> {
        self.find_by_id(id)
            .map(|position| self.entries[position].name.as_str())
    }

    pub fn find_id_by_name(&self, name: &str) -> Option<i64> {
        self.find_by_name(name)
            .map(|position| self.entries[position].id)
    }

    /// Reuses the slot already holding `name`, otherwise appends one. Either
    /// way the entry gets a fresh id and cleared flags and clan, and the file
    /// is rewritten before the table changes.
    pub fn create_entry(&mut self, name: &str) -> PersistenceResult<usize> {
        validate_name(name)?;
        let id = self.top_id + 1;
        let entry = IndexEntry {
            name: name.to_lowercase(),
            id,
            level: 0,
            flags: 0,
            last_login: 0,
            clan: NO_CLAN,
        };
        let mut entries = self.entries.clone();
        let position = match self.find_by_name(name) {
            Some(position) => {
                entries[position] = entry;
                position
            }
            None => {
                entries.push(entry);
                entries.len() - 1
            }
        };
        self.commit(entries)?;
        self.top_id = id;
        Ok(position)
    }

    /// Removes the entry at `position`, keeping the order of the rest.
    pub fn remove_entry(&mut self, position: usize) -> PersistenceResult<Option<IndexEntry>> {
        if position >= self.entries.len() {
            return Ok(None);
        }
        let mut entries = self.entries.clone();
        let removed = entries.remove(position);
        self.commit(entries)?;
        Ok(Some(removed))
    }

    /// Copies level, last login and the deletion/wizlist flags from a saved
    /// record. The file is rewritten only when something changed.
    pub fn sync_from_record(&mut self, record: &CharacterRecord) -> PersistenceResult<bool> {
        let Some(position) = self.find_by_name(&record.name) else {
            return Ok(false);
        };
        let current = &self.entries[position];
        let mut flags = current.flags & !RECORD_SYNCED_FLAGS;
        if record.is_flagged(PLR_DELETED) {
            flags |= PINDEX_DELETED;
        }
        if record.is_flagged(PLR_NODELETE) || record.is_flagged(PLR_CRYO) {
            flags |= PINDEX_NODELETE;
        }
        if record.is_flagged(PLR_FROZEN) || record.is_flagged(PLR_NOWIZLIST) {
            flags |= PINDEX_NOWIZLIST;
        }
        if current.level == record.level
            && current.last_login == record.last_logon
            && current.flags == flags
        {
            return Ok(false);
        }
        let mut entries = self.entries.clone();
        let entry = &mut entries[position];
        entry.level = record.level;
        entry.last_login = record.last_logon;
        entry.flags = flags;
        self.commit(entries)?;
        Ok(true)
    }

    pub fn save(&self) -> PersistenceResult<()> {
        write_atomic(&self.path, &render(&self.entries)).map_err(|source| {
            PersistenceError::FileWrite {
                path: self.path.clone(),
                source,
            }
        })
    }

    fn commit(&mut self, entries: Vec<IndexEntry>) -> PersistenceResult<()> {
        write_atomic(&self.path, &render(&entries)).map_err(|source| {
            PersistenceError::FileWrite {
                path: self.path.clone(),
                source,
            }
        })?;
        self.entries = entries;
        Ok(())
    }
}

fn render(entries: &[IndexEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&entry.to_line());
        out.push('\n');
    }
    out.push_str("~\n");
    out
}
