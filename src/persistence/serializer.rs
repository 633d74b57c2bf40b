use crate::config::PersistenceConfig;
use crate::entities::character::{CharacterRecord, NUM_CONDITIONS};
use crate::entities::flags::FlagArray;
use crate::persistence::atomic_io::write_atomic;
use crate::persistence::blocks::{read_block, write_block, ReadContext, ReadIssues};
use crate::persistence::error::{PersistenceError, PersistenceResult};
use crate::persistence::index::{IndexEntry, PlayerIndex, PINDEX_DELETED, PINDEX_NODELETE};
use crate::persistence::paths::{record_path, BUCKETS};
use crate::persistence::schema::{schema, BlockKind, Emit, FieldKind, FieldSpec};
use crate::persistence::stash::{TransientSnapshot, TransientStash};
use crate::persistence::tagged_line::{decode, LineReader, LineWriter};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

const SECS_PER_DAY: i64 = 86_400;
const IMMORTAL_SKILL: i32 = 100;
const IMMORTAL_ABILITY: i32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    Full,
    /// The character is about to be destroyed; short-lived events are not
    /// written.
    PreDestruction,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub indexed: usize,
    pub parsed: usize,
    pub warnings: usize,
    pub missing_files: Vec<String>,
    pub unindexed_files: usize,
    pub errors: Vec<String>,
    pub missing_dir: bool,
}

#[derive(Debug, Default)]
pub struct CleanReport {
    pub removed: Vec<String>,
    pub errors: Vec<String>,
}

/// Reads and writes character record files under one player directory.
#[derive(Debug, Clone)]
pub struct CharacterStore {
    player_dir: PathBuf,
    config: PersistenceConfig,
}

impl CharacterStore {
    pub fn from_root(root: &Path, config: PersistenceConfig) -> Self {
        Self {
            player_dir: root.join(&config.player_dir),
            config,
        }
    }

    pub fn new(player_dir: impl Into<PathBuf>, config: PersistenceConfig) -> Self {
        Self {
            player_dir: player_dir.into(),
            config,
        }
    }

    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    pub fn player_dir(&self) -> &Path {
        &self.player_dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.player_dir.join(&self.config.index_file)
    }

    pub fn open_index(&self) -> PersistenceResult<PlayerIndex> {
        PlayerIndex::init(self.index_path())
    }

    pub fn record_path(&self, name: &str) -> PersistenceResult<PathBuf> {
        record_path(&self.player_dir, name, &self.config.record_extension)
    }

    pub fn load(&self, index: &PlayerIndex, name: &str) -> PersistenceResult<CharacterRecord> {
        let mut record = CharacterRecord::new();
        self.load_into(index, name, &mut record)?;
        Ok(record)
    }

    /// Replaces every field of `record` with the stored character. On error
    /// `record` is left as it was.
    pub fn load_into(
        &self,
        index: &PlayerIndex,
        name: &str,
        record: &mut CharacterRecord,
    ) -> PersistenceResult<()> {
        if index.find_by_name(name).is_none() {
            return Err(PersistenceError::NotFound {
                name: name.to_string(),
            });
        }
        let path = self.record_path(name)?;
        let data = fs::read_to_string(&path).map_err(|source| PersistenceError::FileOpen {
            path: path.clone(),
            source,
        })?;
        let (loaded, issues) = self.read_record(&data, &path.display().to_string());
        debug!(name, path = %path.display(), issues = issues.total(), "character loaded");
        *record = loaded;
        Ok(())
    }

    /// Parses record text into a fresh record. Bad lines are logged, counted
    /// and skipped.
    pub fn read_record(&self, data: &str, source: &str) -> (CharacterRecord, ReadIssues) {
        let mut record = CharacterRecord::new();
        let mut reader = LineReader::new(data);
        let mut ctx = ReadContext::new(source);
        let schema = schema();
        while let Some(line) = reader.next_line() {
            let line_number = reader.line_number();
            let (tag, value) = decode(line);
            if tag.is_empty() {
                ctx.corrupt(line_number, tag, line);
                continue;
            }
            match schema.lookup(tag) {
                Some(spec) => {
                    read_field(spec, value, line_number, &mut reader, &mut record, &mut ctx)
                }
                None => ctx.unknown_tag(line_number, tag),
            }
        }
        self.finish_load(&mut record);
        (record, ctx.issues)
    }

    fn finish_load(&self, record: &mut CharacterRecord) {
        if record.level >= self.config.immortal_level {
            record
                .skills
                .iter_mut()
                .skip(1)
                .for_each(|skill| *skill = IMMORTAL_SKILL);
            record
                .ability_ranks
                .iter_mut()
                .skip(1)
                .for_each(|rank| *rank = IMMORTAL_ABILITY);
            record.conditions = [-1; NUM_CONDITIONS];
        }
        record.affect_total();
    }

    /// Renders a record in write order. `snapshot` carries whatever was
    /// detached from it for the save.
    pub fn write_record(
        &self,
        record: &CharacterRecord,
        snapshot: &TransientSnapshot<'_>,
        mode: SaveMode,
    ) -> String {
        let immortal = record.level >= self.config.immortal_level;
        let mut out = LineWriter::new();
        for spec in schema().fields() {
            if spec.emit == Emit::ReadOnly || (spec.mortal_only && immortal) {
                continue;
            }
            let always = spec.emit == Emit::Always;
            match spec.kind {
                FieldKind::Int { get, default, .. } => {
                    let value = get(record);
                    if always || value != default {
                        out.field(spec.tag, &value.to_string());
                    }
                }
                FieldKind::Text { get, .. } => {
                    let value = get(record);
                    if always || !value.is_empty() {
                        out.field(spec.tag, value);
                    }
                }
                FieldKind::LongText { get, .. } => {
                    let value = get(record);
                    if always || !value.is_empty() {
                        out.long_text(spec.tag, value);
                    }
                }
                FieldKind::Pair { get, .. } => {
                    let (first, second) = get(record);
                    if always || (first, second) != (0, 0) {
                        out.field(spec.tag, &format!("{}/{}", first, second));
                    }
                }
                FieldKind::Flags { get, .. } => {
                    let flags = get(record);
                    if always || !flags.is_empty() {
                        out.field(spec.tag, &flags.to_ascii());
                    }
                }
                FieldKind::Block(kind) => {
                    if kind == BlockKind::Events && mode == SaveMode::PreDestruction {
                        continue;
                    }
                    write_block(kind, spec.tag, record, snapshot, &mut out);
                }
            }
        }
        out.finish()
    }

    /// Writes the record with its transient state detached, puts that state
    /// back whatever the outcome, then refreshes the index entry. A name not
    /// yet indexed gets its entry here, dropped again if the write fails.
    pub fn save(
        &self,
        index: &mut PlayerIndex,
        record: &mut CharacterRecord,
        mode: SaveMode,
    ) -> PersistenceResult<()> {
        let path = self.record_path(&record.name)?;
        let created = match index.find_by_name(&record.name) {
            Some(_) => None,
            None => {
                let position = index.create_entry(&record.name)?;
                let previous_id = record.id;
                record.id = index.entries()[position].id;
                info!(name = %record.name, id = record.id, "index entry created");
                Some((position, previous_id))
            }
        };
        let written = {
            let stash = TransientStash::detach(record);
            let data = self.write_record(stash.record(), &stash.snapshot(), mode);
            write_atomic(&path, &data)
        };
        if let Err(source) = written {
            error!(name = %record.name, path = %path.display(), %source, "character save failed");
            if let Some((position, previous_id)) = created {
                record.id = previous_id;
                index.remove_entry(position)?;
            }
            return Err(PersistenceError::FileWrite { path, source });
        }
        info!(name = %record.name, path = %path.display(), ?mode, "character saved");
        index.sync_from_record(record)?;
        Ok(())
    }

    /// Removes the record file and the index entry.
    pub fn delete_character(&self, index: &mut PlayerIndex, name: &str) -> PersistenceResult<()> {
        let position = index
            .find_by_name(name)
            .ok_or_else(|| PersistenceError::NotFound {
                name: name.to_string(),
            })?;
        let path = self.record_path(name)?;
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(PersistenceError::FileRemove { path, source }),
        }
        index.remove_entry(position)?;
        info!(name, "character deleted");
        Ok(())
    }

    /// Purges characters flagged deleted, and idle characters whose level
    /// falls under one of the configured criteria. Protected entries stay.
    pub fn clean_records(&self, index: &mut PlayerIndex, now: i64) -> CleanReport {
        let doomed: Vec<String> = index
            .entries()
            .iter()
            .filter(|entry| self.should_purge(entry, now))
            .map(|entry| entry.name.clone())
            .collect();
        let mut report = CleanReport::default();
        for name in doomed {
            match self.delete_character(index, &name) {
                Ok(()) => report.removed.push(name),
                Err(err) => report.errors.push(format!("clean {}: {}", name, err)),
            }
        }
        report
    }

    fn should_purge(&self, entry: &IndexEntry, now: i64) -> bool {
        if entry.has_flag(PINDEX_NODELETE) {
            return false;
        }
        if entry.has_flag(PINDEX_DELETED) {
            return true;
        }
        let idle = now - entry.last_login;
        self.config
            .clean_criteria
            .iter()
            .any(|criterion| entry.level <= criterion.level && idle > criterion.days * SECS_PER_DAY)
    }

    /// Parses every indexed record and counts record files the index does not
    /// know about.
    pub fn validate_records(&self, index: &PlayerIndex) -> ValidationReport {
        let mut report = ValidationReport::default();
        if !self.player_dir.is_dir() {
            report.missing_dir = true;
            return report;
        }
        for entry in index.entries() {
            report.indexed += 1;
            let path = match self.record_path(&entry.name) {
                Ok(path) => path,
                Err(err) => {
                    report.errors.push(err.to_string());
                    continue;
                }
            };
            let data = match fs::read_to_string(&path) {
                Ok(data) => data,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    report.missing_files.push(entry.name.clone());
                    continue;
                }
                Err(err) => {
                    report
                        .errors
                        .push(format!("record read failed for {}: {}", path.display(), err));
                    continue;
                }
            };
            let (record, issues) = self.read_record(&data, &path.display().to_string());
            report.parsed += 1;
            report.warnings += issues.total();
            if !record.name.eq_ignore_ascii_case(&entry.name) {
                report.errors.push(format!(
                    "record name mismatch for {}: file says {:?}",
                    path.display(),
                    record.name
                ));
            }
        }
        for bucket in BUCKETS {
            let Ok(entries) = fs::read_dir(self.player_dir.join(bucket)) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                let is_record = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case(&self.config.record_extension))
                    .unwrap_or(false);
                let stem = path.file_stem().and_then(|stem| stem.to_str());
                if let (true, Some(stem)) = (is_record, stem) {
                    if index.find_by_name(stem).is_none() {
                        report.unindexed_files += 1;
                    }
                }
            }
        }
        report
    }
}

fn read_field(
    spec: &FieldSpec,
    value: &str,
    line_number: usize,
    reader: &mut LineReader<'_>,
    record: &mut CharacterRecord,
    ctx: &mut ReadContext<'_>,
) {
    match spec.kind {
        FieldKind::Int { set, .. } => match parse_int(value) {
            Some(parsed) if set(record, parsed) => {}
            _ => ctx.corrupt(line_number, spec.tag, value),
        },
        FieldKind::Text { set, .. } => set(record, value.to_string()),
        FieldKind::LongText { set, .. } => set(record, reader.read_long_text()),
        FieldKind::Pair { set, .. } => match parse_pair(value) {
            Some((first, second)) => set(record, first, second),
            None => ctx.corrupt(line_number, spec.tag, value),
        },
        FieldKind::Flags { set, .. } => set(record, FlagArray::parse_ascii(value)),
        FieldKind::Block(kind) => read_block(kind, spec.tag, value, reader, record, ctx),
    }
}

fn parse_int(value: &str) -> Option<i64> {
    value.split_whitespace().next()?.parse().ok()
}

/// `a/b`, or a bare `a` with the second half zero.
fn parse_pair(value: &str) -> Option<(i32, i32)> {
    let value = value.trim();
    match value.split_once('/') {
        Some((first, second)) => Some((first.trim().parse().ok()?, second.trim().parse().ok()?)),
        None => Some((value.parse().ok()?, 0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::affects::{Affect, ApplyLocation};
    use crate::entities::character::{
        Alias, AliasKind, KnownSpell, ScheduledEvent, HUNGER, PLR_DELETED, PLR_NODELETE,
    };
    use crate::entities::damage_reduction::{DamageReduction, DrBypass};
    use crate::entities::equipment::{Item, WearSlot};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: CharacterStore,
        index: PlayerIndex,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().expect("temp");
        let store = CharacterStore::from_root(dir.path(), PersistenceConfig::default());
        let index = store.open_index().expect("index");
        Fixture {
            _dir: dir,
            store,
            index,
        }
    }

    fn new_character(fixture: &mut Fixture, name: &str) -> CharacterRecord {
        let position = fixture.index.create_entry(name).expect("entry");
        let mut record = CharacterRecord::named(name);
        record.id = fixture.index.entries()[position].id;
        record
    }

    fn populated(fixture: &mut Fixture) -> CharacterRecord {
        let mut record = new_character(fixture, "Arthas");
        record.password = "x1y2z3".to_string();
        record.title = "the Fallen".to_string();
        record.description = "Pale hair.\n\nA cold stare.".to_string();
        record.todo = "finish quest".to_string();
        record.birth = 1_600_000_000;
        record.played = 86_000;
        record.last_logon = 1_700_000_000;
        record.level = 20;
        record.class = 3;
        record.size = 2;
        record.alignment = -750;
        record.plr_flags.set(40);
        record.prf_flags.set(3);
        record.saves[4] = 2;
        record.resistances[20] = 15;
        record.load_room = 3001;
        record.preferred_arcane = 2;
        record.class_feat_points[0] = 3;
        record.class_feat_points[5] = 1;
        record.conditions[HUNGER] = 12;
        record.hit = 50;
        record.max_hit = 120;
        record.attributes.strength = 18;
        record.attributes.strength_add = 50;
        record.attributes.charisma = 9;
        record.experience = 5_000_000_000;
        record.page_length = 60;
        record.current_quests[1] = 4400;
        record.completed_quests = vec![100, 205];
        record.clan = 3;
        record.skills[12] = 75;
        record.ability_ranks[200] = 4;
        record.feats[1199] = 1;
        record.known_spells = vec![KnownSpell { class: 3, spell: 44 }];
        record.class_levels[3] = 20;
        record.events = vec![ScheduledEvent { id: 9, remaining: 120 }];
        record.stored_affects = vec![Affect {
            bonus_type: 4,
            specific: 2,
            ..Affect::new(31, 10, -1, ApplyLocation::Save(1)).with_flag(40)
        }];
        record.damage_reduction = vec![
            DamageReduction {
                amount: 5,
                max_damage: 50,
                spell: 22,
                feat: 0,
                bypass: [
                    DrBypass { category: 1, value: 2 },
                    DrBypass::default(),
                    DrBypass::default(),
                ],
            },
            DamageReduction {
                amount: 2,
                feat: 17,
                ..DamageReduction::default()
            },
        ];
        record.aliases = vec![Alias {
            alias: "k".to_string(),
            replacement: "kill $1".to_string(),
            kind: AliasKind::Complex,
        }];
        record.affect_total();
        record
    }

    #[test]
    fn save_then_load_round_trips() {
        let mut fixture = fixture();
        let mut record = populated(&mut fixture);
        fixture
            .store
            .save(&mut fixture.index, &mut record, SaveMode::Full)
            .expect("save");
        let loaded = fixture.store.load(&fixture.index, "arthas").expect("load");
        assert_eq!(loaded, record);
    }

    #[test]
    fn default_fields_are_not_written() {
        let fixture = fixture();
        let mut record = CharacterRecord::named("Tess");
        let written = |record: &CharacterRecord| {
            fixture
                .store
                .write_record(record, &TransientSnapshot::default(), SaveMode::Full)
        };
        assert_eq!(
            written(&record),
            "Name: Tess\nId  : 0\nBrth: 0\nPlyd: 0\nLast: 0\n"
        );
        record.gold = 5;
        record.size = 1;
        assert!(written(&record).contains("Gold: 5\n"));
        assert!(written(&record).contains("Size: 1\n"));
        record.gold = 0;
        record.size = -1;
        assert!(!written(&record).contains("Gold"));
        assert!(!written(&record).contains("Size"));
    }

    #[test]
    fn haste_survives_save_but_not_reload() {
        let mut fixture = fixture();
        let mut record = new_character(&mut fixture, "Jaina");
        record.attributes.strength = 20;
        record.affect_total();
        let haste = Affect::new(7, 3, 2, ApplyLocation::Strength);
        record.add_affect(haste);

        fixture
            .store
            .save(&mut fixture.index, &mut record, SaveMode::Full)
            .expect("save");
        assert_eq!(record.affects(), &[haste]);
        assert_eq!(record.affects()[0].duration, 3);
        assert_eq!(record.effective().attributes.strength, 22);

        let path = fixture.store.record_path("jaina").expect("path");
        let data = fs::read_to_string(path).expect("read");
        assert!(data.contains("Str : 20/0\n"));

        let mut reloaded = fixture.store.load(&fixture.index, "Jaina").expect("load");
        assert_eq!(reloaded.attributes.strength, 20);
        assert!(reloaded.affects().is_empty());
        assert_eq!(reloaded.effective().attributes.strength, 20);
        assert_eq!(reloaded.stored_affects, vec![haste]);

        reloaded.reapply_stored_affects();
        assert_eq!(reloaded.effective().attributes.strength, 22);
    }

    #[test]
    fn failed_write_restores_state_and_skips_index() {
        let mut fixture = fixture();
        let mut record = new_character(&mut fixture, "Thrall");
        record.level = 12;
        record.add_affect(Affect::new(7, 3, 2, ApplyLocation::Strength));
        record
            .equip(WearSlot::Head, Item::new(100, "helm").with_apply(ApplyLocation::ArmorClass, 1))
            .expect("equip");
        let before = record.clone();

        let path = fixture.store.record_path("thrall").expect("path");
        fs::create_dir_all(path.join("blocker")).expect("block");

        let err = fixture
            .store
            .save(&mut fixture.index, &mut record, SaveMode::Full)
            .expect_err("write must fail");
        assert!(matches!(err, PersistenceError::FileWrite { .. }));
        assert_eq!(record, before);
        assert_eq!(fixture.index.entries()[0].level, 0);
    }

    #[test]
    fn equipment_stays_on_through_a_save() {
        let mut fixture = fixture();
        let mut record = new_character(&mut fixture, "Uther");
        record.hitroll = 2;
        record.armor_class = 40;
        record.affect_total();
        let helm = Item::new(100, "helm")
            .with_apply(ApplyLocation::Hitroll, 3)
            .with_apply(ApplyLocation::ArmorClass, 10);
        record.equip(WearSlot::Head, helm).expect("equip");
        let before = record.clone();
        assert_eq!(before.effective().hitroll, 5);

        fixture
            .store
            .save(&mut fixture.index, &mut record, SaveMode::Full)
            .expect("save");
        assert_eq!(record.equipment(), before.equipment());
        assert_eq!(record.effective(), before.effective());
        assert_eq!(record, before);

        let path = fixture.store.record_path("uther").expect("path");
        let data = fs::read_to_string(path).expect("read");
        assert!(data.contains("Hrol: 2\n"));
        assert!(data.contains("Ac  : 40\n"));
        assert!(!data.contains("Hrol: 5"));
        assert!(!data.contains("Ac  : 50"));

        let reloaded = fixture.store.load(&fixture.index, "uther").expect("load");
        assert_eq!(reloaded.hitroll, 2);
        assert_eq!(reloaded.effective().hitroll, 2);
    }

    #[test]
    fn first_save_creates_the_index_entry() {
        let mut fixture = fixture();
        let mut record = CharacterRecord::named("Orphan");
        record.level = 3;
        fixture
            .store
            .save(&mut fixture.index, &mut record, SaveMode::Full)
            .expect("save");
        let position = fixture.index.find_by_name("orphan").expect("indexed");
        assert_eq!(fixture.index.entries()[position].id, record.id);
        assert_eq!(fixture.index.entries()[position].level, 3);
        assert_eq!(record.id, fixture.index.top_id());

        let loaded = fixture.store.load(&fixture.index, "Orphan").expect("load");
        assert_eq!(loaded.id, record.id);
        let reopened = fixture.store.open_index().expect("index");
        assert!(reopened.find_by_name("orphan").is_some());
    }

    #[test]
    fn failed_first_save_leaves_no_index_entry() {
        let mut fixture = fixture();
        let mut record = CharacterRecord::named("Stray");
        let path = fixture.store.record_path("stray").expect("path");
        fs::create_dir_all(path.join("blocker")).expect("block");

        let err = fixture
            .store
            .save(&mut fixture.index, &mut record, SaveMode::Full)
            .expect_err("write must fail");
        assert!(matches!(err, PersistenceError::FileWrite { .. }));
        assert!(fixture.index.find_by_name("stray").is_none());
        assert_eq!(record.id, 0);
        let reopened = fixture.store.open_index().expect("index");
        assert!(reopened.entries().is_empty());
    }

    #[test]
    fn save_updates_index_metadata() {
        let mut fixture = fixture();
        let mut record = new_character(&mut fixture, "Sylvanas");
        record.level = 25;
        record.last_logon = 1_700_000_500;
        fixture
            .store
            .save(&mut fixture.index, &mut record, SaveMode::Full)
            .expect("save");
        let reopened = fixture.store.open_index().expect("index");
        assert_eq!(reopened.entries()[0].level, 25);
        assert_eq!(reopened.entries()[0].last_login, 1_700_000_500);
    }

    #[test]
    fn load_requires_index_entry_and_file() {
        let mut fixture = fixture();
        let missing = fixture.store.load(&fixture.index, "nobody").expect_err("absent");
        assert!(matches!(missing, PersistenceError::NotFound { .. }));

        fixture.index.create_entry("ghost").expect("entry");
        let no_file = fixture.store.load(&fixture.index, "ghost").expect_err("no file");
        assert!(matches!(no_file, PersistenceError::FileOpen { .. }));

        let mut live = CharacterRecord::named("keep");
        assert!(fixture.store.load_into(&fixture.index, "ghost", &mut live).is_err());
        assert_eq!(live.name, "keep");
    }

    #[test]
    fn bad_lines_are_skipped() {
        let fixture = fixture();
        let (record, issues) = fixture.store.read_record(
            "Name: Illidan\nZzzz: 1\nLevl: abc\nGold: 7\nxy\nHit : 10/x\nAct : c\n",
            "test",
        );
        assert_eq!(record.name, "Illidan");
        assert_eq!(record.gold, 7);
        assert_eq!(record.level, 0);
        assert!(record.plr_flags.is_set(2));
        assert_eq!(issues.unknown_tags, 1);
        assert_eq!(issues.corrupt_lines, 3);
    }

    #[test]
    fn out_of_range_numbers_are_rejected() {
        let fixture = fixture();
        let (record, issues) = fixture.store.read_record(
            "Name: Maiev\nLevl: 4294967306\nHit : 4294967306/10\nMove: 20/30\nAc  : -12\n",
            "test",
        );
        assert_eq!(record.level, 0);
        assert_eq!((record.hit, record.max_hit), (0, 0));
        assert_eq!((record.move_points, record.max_move), (20, 30));
        assert_eq!(record.armor_class, -12);
        assert_eq!(issues.corrupt_lines, 2);
    }

    #[test]
    fn legacy_lines_load() {
        let fixture = fixture();
        let (record, issues) = fixture
            .store
            .read_record("Name: Old\nQpnt: 14\nStr : 16\nAffs:\n7 3 2 1 5\n0 0 0 0 0\n", "test");
        assert_eq!(issues.total(), 0);
        assert_eq!(record.quest_points, 14);
        assert_eq!(record.attributes.strength, 16);
        assert!(record.stored_affects[0].bitvector.is_set(5));
        let written = fixture
            .store
            .write_record(&record, &TransientSnapshot::default(), SaveMode::Full);
        assert!(written.contains("Qstp: 14\n"));
        assert!(!written.contains("Qpnt"));
    }

    #[test]
    fn immortals_get_elevated_stats() {
        let fixture = fixture();
        let (record, _) = fixture
            .store
            .read_record("Name: Admin\nLevl: 34\nSkil:\n5 20\n0 0\nHung: 3\n", "test");
        assert_eq!(record.skills[5], 100);
        assert_eq!(record.skills[599], 100);
        assert_eq!(record.ability_ranks[1], 40);
        assert_eq!(record.conditions, [-1; NUM_CONDITIONS]);
        let written = fixture
            .store
            .write_record(&record, &TransientSnapshot::default(), SaveMode::Full);
        assert!(!written.contains("Skil"));
        assert!(!written.contains("Ablt"));
        assert!(!written.contains("Hung"));
    }

    #[test]
    fn pre_destruction_save_skips_events() {
        let fixture = fixture();
        let mut record = CharacterRecord::named("Brief");
        record.events.push(ScheduledEvent { id: 2, remaining: 30 });
        let snapshot = TransientSnapshot::default();
        let full = fixture.store.write_record(&record, &snapshot, SaveMode::Full);
        let final_save = fixture
            .store
            .write_record(&record, &snapshot, SaveMode::PreDestruction);
        assert!(full.contains("Evnt:\n2 30\n-1 -1\n"));
        assert!(!final_save.contains("Evnt"));
    }

    #[test]
    fn clean_purges_deleted_and_idle_characters() {
        let mut fixture = fixture();
        let now = 100 * SECS_PER_DAY;

        let mut idle = new_character(&mut fixture, "Idle");
        idle.level = 1;
        fixture
            .store
            .save(&mut fixture.index, &mut idle, SaveMode::Full)
            .expect("save idle");

        let mut doomed = new_character(&mut fixture, "Doomed");
        doomed.level = 50;
        doomed.last_logon = now;
        doomed.plr_flags.set(PLR_DELETED);
        fixture
            .store
            .save(&mut fixture.index, &mut doomed, SaveMode::Full)
            .expect("save doomed");

        let mut keeper = new_character(&mut fixture, "Keeper");
        keeper.level = 1;
        keeper.plr_flags.set(PLR_NODELETE);
        fixture
            .store
            .save(&mut fixture.index, &mut keeper, SaveMode::Full)
            .expect("save keeper");

        let report = fixture.store.clean_records(&mut fixture.index, now);
        assert!(report.errors.is_empty(), "{:?}", report.errors);
        assert_eq!(report.removed, ["idle", "doomed"]);
        assert_eq!(fixture.index.len(), 1);
        assert!(!fixture.store.record_path("idle").expect("path").exists());
        assert!(fixture.store.load(&fixture.index, "keeper").is_ok());
    }

    #[test]
    fn validation_reports_missing_and_unindexed_files() {
        let mut fixture = fixture();
        let mut saved = new_character(&mut fixture, "Saved");
        fixture
            .store
            .save(&mut fixture.index, &mut saved, SaveMode::Full)
            .expect("save");
        fixture.index.create_entry("unsaved").expect("entry");
        let stray = fixture.store.record_path("stray").expect("path");
        fs::write(&stray, "Name: Stray\n").expect("write stray");

        let report = fixture.store.validate_records(&fixture.index);
        assert!(!report.missing_dir);
        assert_eq!(report.indexed, 2);
        assert_eq!(report.parsed, 1);
        assert_eq!(report.missing_files, ["unsaved"]);
        assert_eq!(report.unindexed_files, 1);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn delete_removes_file_and_entry() {
        let mut fixture = fixture();
        let mut record = new_character(&mut fixture, "Gone");
        fixture
            .store
            .save(&mut fixture.index, &mut record, SaveMode::Full)
            .expect("save");
        fixture
            .store
            .delete_character(&mut fixture.index, "GONE")
            .expect("delete");
        assert!(fixture.index.is_empty());
        assert!(!fixture.store.record_path("gone").expect("path").exists());
        assert!(matches!(
            fixture.store.delete_character(&mut fixture.index, "gone"),
            Err(PersistenceError::NotFound { .. })
        ));
    }
}
