use crate::entities::affects::{Affect, ApplyLocation, NUM_AFF_FLAGS};
use crate::entities::character::{
    Alias, AliasKind, CharacterRecord, KnownSpell, ScheduledEvent, MAX_ABILITIES, MAX_CLASSES,
    MAX_SKILLS, NOTHING, NUM_FEATS,
};
use crate::entities::damage_reduction::{DamageReduction, DrBypass, DrSource, MAX_DR_BYPASS};
use crate::entities::flags::{FlagArray, FLAG_WORDS};
use crate::persistence::schema::BlockKind;
use crate::persistence::stash::{TransientSnapshot, MAX_AFFECT};
use crate::persistence::tagged_line::{single_line, LineReader, LineWriter};
use std::collections::HashSet;
use tracing::warn;

pub const MAX_SPELLS: i64 = 400;
pub const MAX_COMPLETED_QUESTS: usize = 1024;
pub const MAX_EVENTS: usize = 64;
pub const MAX_ALIASES: usize = 100;
pub const MAX_DR_ENTRIES_READ: usize = 200;
pub const MAX_DR_ENTRIES_WRITTEN: usize = 100;
pub const MAX_KNOWN_SPELLS: usize = MAX_CLASSES * MAX_SPELLS as usize;

/// Quest lists written by 16-bit builds end with this instead of -1.
const LEGACY_NOTHING: i64 = 65535;

/// Counts of the recoverable problems found while reading one record.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReadIssues {
    pub unknown_tags: usize,
    pub corrupt_lines: usize,
    pub out_of_range: usize,
    pub unterminated_blocks: usize,
}

impl ReadIssues {
    pub fn total(&self) -> usize {
        self.unknown_tags + self.corrupt_lines + self.out_of_range + self.unterminated_blocks
    }
}

/// Where the lines being read come from, plus what went wrong so far.
pub struct ReadContext<'a> {
    pub source: &'a str,
    pub issues: ReadIssues,
}

impl<'a> ReadContext<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            issues: ReadIssues::default(),
        }
    }

    pub fn unknown_tag(&mut self, line_number: usize, tag: &str) {
        self.issues.unknown_tags += 1;
        warn!(source = self.source, line_number, tag, "unknown tag skipped");
    }

    pub fn corrupt(&mut self, line_number: usize, tag: &str, line: &str) {
        self.issues.corrupt_lines += 1;
        warn!(source = self.source, line_number, tag, line, "corrupt line skipped");
    }

    pub fn out_of_range(&mut self, line_number: usize, tag: &str, index: i64) {
        self.issues.out_of_range += 1;
        warn!(source = self.source, line_number, tag, index, "index out of range, entry skipped");
    }

    fn unterminated(&mut self, tag: &str, reason: &str) {
        self.issues.unterminated_blocks += 1;
        warn!(source = self.source, tag, reason, "block stopped before its sentinel");
    }
}

/// Leading integers of a tuple line; stops at the first token that is not one.
pub fn scan_ints(line: &str, max: usize) -> Vec<i64> {
    line.split_whitespace()
        .take(max)
        .map_while(|token| token.parse::<i64>().ok())
        .collect()
}

fn first_is(line: &str, value: i64) -> bool {
    scan_ints(line, 1).first() == Some(&value)
}

/// Feeds tuple lines to `handle` until `is_end` matches the sentinel or the
/// block runs out. At most `cap` lines reach `handle`; further tuple lines up
/// to the sentinel are dropped. A line that does not start with a number is
/// left unread for the caller.
fn read_tuples<'a, E, F>(
    reader: &mut LineReader<'a>,
    ctx: &mut ReadContext<'_>,
    tag: &str,
    cap: usize,
    is_end: E,
    mut handle: F,
) where
    E: Fn(&str) -> bool,
    F: FnMut(&mut LineReader<'a>, &mut ReadContext<'_>, &'a str, usize),
{
    let mut entries = 0;
    let mut dropped = 0;
    let terminated = loop {
        let Some(line) = reader.next_line() else {
            break false;
        };
        if scan_ints(line, 1).is_empty() {
            reader.push_back(line);
            break false;
        }
        if is_end(line) {
            break true;
        }
        if entries < cap {
            let line_number = reader.line_number();
            handle(reader, ctx, line, line_number);
            entries += 1;
        } else {
            dropped += 1;
        }
    };
    if dropped > 0 {
        ctx.unterminated(tag, "iteration cap reached");
    } else if !terminated {
        ctx.unterminated(tag, "sentinel missing");
    }
}

pub fn read_block(
    kind: BlockKind,
    tag: &str,
    value: &str,
    reader: &mut LineReader<'_>,
    record: &mut CharacterRecord,
    ctx: &mut ReadContext<'_>,
) {
    match kind {
        BlockKind::Skills => read_indexed(reader, ctx, tag, &mut record.skills, 1, MAX_SKILLS - 1),
        BlockKind::Abilities => {
            read_indexed(reader, ctx, tag, &mut record.ability_ranks, 1, MAX_ABILITIES)
        }
        BlockKind::Feats => read_indexed(reader, ctx, tag, &mut record.feats, 1, NUM_FEATS - 1),
        BlockKind::KnownSpells => read_known_spells(reader, ctx, tag, record),
        BlockKind::ClassLevels => read_class_levels(reader, ctx, tag, record),
        BlockKind::ClassFeatPoints => read_class_feat_points(reader, ctx, tag, record),
        BlockKind::CompletedQuests => read_completed_quests(reader, ctx, tag, record),
        BlockKind::Events => read_events(reader, ctx, tag, record),
        BlockKind::Affects => read_affects(reader, ctx, tag, record),
        BlockKind::DamageReduction => read_damage_reduction(reader, ctx, tag, record),
        BlockKind::Aliases => read_aliases(reader, ctx, tag, value, record),
    }
}

/// `id value` lines ending with id 0; ids outside `min..=max` are skipped.
fn read_indexed(
    reader: &mut LineReader<'_>,
    ctx: &mut ReadContext<'_>,
    tag: &str,
    target: &mut [i32],
    min: usize,
    max: usize,
) {
    let is_end = |line: &str| first_is(line, 0);
    read_tuples(reader, ctx, tag, max, is_end, |_, ctx, line, line_number| {
        match scan_ints(line, 2).as_slice() {
            [id, value] => {
                let slot = usize::try_from(*id).ok().filter(|id| (min..=max).contains(id));
                match (slot, i32::try_from(*value)) {
                    (Some(id), Ok(value)) if id < target.len() => target[id] = value,
                    (Some(_), Err(_)) => ctx.corrupt(line_number, tag, line),
                    _ => ctx.out_of_range(line_number, tag, *id),
                }
            }
            _ => ctx.corrupt(line_number, tag, line),
        }
    });
}

fn read_known_spells(
    reader: &mut LineReader<'_>,
    ctx: &mut ReadContext<'_>,
    tag: &str,
    record: &mut CharacterRecord,
) {
    let is_end = |line: &str| first_is(line, -1);
    read_tuples(reader, ctx, tag, MAX_KNOWN_SPELLS, is_end, |_, ctx, line, line_number| {
        match scan_ints(line, 2).as_slice() {
            [class, spell] => {
                if !(0..MAX_CLASSES as i64).contains(class) {
                    ctx.out_of_range(line_number, tag, *class);
                } else if !(1..MAX_SPELLS).contains(spell) {
                    ctx.out_of_range(line_number, tag, *spell);
                } else {
                    record.known_spells.push(KnownSpell {
                        class: *class as i32,
                        spell: *spell as i32,
                    });
                }
            }
            _ => ctx.corrupt(line_number, tag, line),
        }
    });
}

fn read_class_levels(
    reader: &mut LineReader<'_>,
    ctx: &mut ReadContext<'_>,
    tag: &str,
    record: &mut CharacterRecord,
) {
    let is_end = |line: &str| first_is(line, -1);
    read_tuples(reader, ctx, tag, MAX_CLASSES, is_end, |_, ctx, line, line_number| {
        match scan_ints(line, 2).as_slice() {
            [class, level] => {
                let class_slot = usize::try_from(*class).ok().filter(|class| *class < MAX_CLASSES);
                match (class_slot, i32::try_from(*level)) {
                    (Some(class), Ok(level)) => record.class_levels[class] = level,
                    (Some(_), Err(_)) => ctx.corrupt(line_number, tag, line),
                    (None, _) => ctx.out_of_range(line_number, tag, *class),
                }
            }
            _ => ctx.corrupt(line_number, tag, line),
        }
    });
}

/// `class points` lines; any line with fewer than two numbers ends the block.
fn read_class_feat_points(
    reader: &mut LineReader<'_>,
    ctx: &mut ReadContext<'_>,
    tag: &str,
    record: &mut CharacterRecord,
) {
    let is_end = |line: &str| scan_ints(line, 2).len() < 2;
    read_tuples(reader, ctx, tag, MAX_CLASSES, is_end, |_, ctx, line, line_number| {
        let fields = scan_ints(line, 2);
        let [class, points] = fields.as_slice() else {
            return;
        };
        let class_slot = usize::try_from(*class).ok().filter(|class| *class < MAX_CLASSES);
        match (class_slot, i32::try_from(*points)) {
            (Some(class), Ok(points)) => record.class_feat_points[class] = points,
            (Some(_), Err(_)) => ctx.corrupt(line_number, tag, line),
            (None, _) => ctx.out_of_range(line_number, tag, *class),
        }
    });
}

fn read_completed_quests(
    reader: &mut LineReader<'_>,
    ctx: &mut ReadContext<'_>,
    tag: &str,
    record: &mut CharacterRecord,
) {
    let is_end = |line: &str| first_is(line, NOTHING as i64) || first_is(line, LEGACY_NOTHING);
    read_tuples(reader, ctx, tag, MAX_COMPLETED_QUESTS, is_end, |_, ctx, line, line_number| {
        match scan_ints(line, 1).first().map(|vnum| i32::try_from(*vnum)) {
            Some(Ok(vnum)) => record.completed_quests.push(vnum),
            _ => ctx.corrupt(line_number, tag, line),
        }
    });
}

fn read_events(
    reader: &mut LineReader<'_>,
    ctx: &mut ReadContext<'_>,
    tag: &str,
    record: &mut CharacterRecord,
) {
    let is_end = |line: &str| first_is(line, -1);
    read_tuples(reader, ctx, tag, MAX_EVENTS, is_end, |_, ctx, line, line_number| {
        match scan_ints(line, 2).as_slice() {
            [id, remaining] => match i32::try_from(*id) {
                Ok(id) => record.events.push(ScheduledEvent {
                    id,
                    remaining: *remaining,
                }),
                Err(_) => ctx.corrupt(line_number, tag, line),
            },
            _ => ctx.corrupt(line_number, tag, line),
        }
    });
}

/// Affect lines come in four generations:
/// `spell dur mod loc b0 b1 b2 b3 bonus specific` (10),
/// without `specific` (9), without `bonus` (8), and
/// `spell dur mod loc bit` (5) where the last field is a single bit number.
pub fn parse_affect(fields: &[i64]) -> Option<Affect> {
    if fields.len() < 4 {
        return None;
    }
    let (head, rest) = fields.split_at(4);
    let mut affect = Affect::new(
        head[0] as i32,
        head[1] as i32,
        head[2] as i32,
        ApplyLocation::from_code(head[3] as i32),
    );
    match rest.len() {
        1 => {
            let bit = rest[0];
            if bit > 0 && bit <= NUM_AFF_FLAGS as i64 {
                affect.bitvector.set(bit as usize);
            }
        }
        4..=6 => {
            let mut words = [0u32; FLAG_WORDS];
            for (word, value) in words.iter_mut().zip(rest) {
                *word = *value as u32;
            }
            affect.bitvector = FlagArray::from_words(words);
            affect.bonus_type = rest.get(4).copied().unwrap_or(0) as i32;
            affect.specific = rest.get(5).copied().unwrap_or(0) as i32;
        }
        _ => return None,
    }
    Some(affect)
}

fn read_affects(
    reader: &mut LineReader<'_>,
    ctx: &mut ReadContext<'_>,
    tag: &str,
    record: &mut CharacterRecord,
) {
    let is_end = |line: &str| first_is(line, 0);
    read_tuples(reader, ctx, tag, MAX_AFFECT, is_end, |_, ctx, line, line_number| {
        match parse_affect(&scan_ints(line, 10)) {
            Some(affect) => record.stored_affects.push(affect),
            None => ctx.corrupt(line_number, tag, line),
        }
    });
}

fn read_damage_reduction(
    reader: &mut LineReader<'_>,
    ctx: &mut ReadContext<'_>,
    tag: &str,
    record: &mut CharacterRecord,
) {
    let is_end = |line: &str| first_is(line, 0);
    read_tuples(reader, ctx, tag, MAX_DR_ENTRIES_READ, is_end, |reader, ctx, line, line_number| {
        match scan_ints(line, 5).as_slice() {
            [1, amount, max_damage, spell, feat] => {
                let mut entry = DamageReduction {
                    amount: *amount as i32,
                    max_damage: *max_damage as i32,
                    spell: *spell as i32,
                    feat: *feat as i32,
                    bypass: [DrBypass::default(); MAX_DR_BYPASS],
                };
                for bypass in entry.bypass.iter_mut() {
                    let Some(bypass_line) = reader.next_line() else {
                        break;
                    };
                    match scan_ints(bypass_line, 2).as_slice() {
                        [category, value] => {
                            bypass.category = *category as i32;
                            bypass.value = *value as i32;
                        }
                        _ => ctx.corrupt(reader.line_number(), tag, bypass_line),
                    }
                }
                record.damage_reduction.push(entry);
            }
            _ => ctx.corrupt(line_number, tag, line),
        }
    });
}

/// `Alis: N` followed by N triples of alias, replacement and kind. The text
/// lines carry one leading space.
fn read_aliases(
    reader: &mut LineReader<'_>,
    ctx: &mut ReadContext<'_>,
    tag: &str,
    value: &str,
    record: &mut CharacterRecord,
) {
    let count = match scan_ints(value, 1).first() {
        Some(count) => (*count).clamp(0, MAX_ALIASES as i64) as usize,
        None => {
            ctx.corrupt(reader.line_number(), tag, value);
            return;
        }
    };
    for _ in 0..count {
        let (Some(alias), Some(replacement), Some(kind)) =
            (reader.next_line(), reader.next_line(), reader.next_line())
        else {
            ctx.unterminated(tag, "end of input");
            return;
        };
        let alias = strip_one_space(alias);
        let replacement = strip_one_space(replacement);
        let kind = kind.trim();
        if alias.is_empty() || replacement.is_empty() || kind.is_empty() {
            ctx.corrupt(reader.line_number(), tag, alias);
            continue;
        }
        record.aliases.push(Alias {
            alias: alias.to_string(),
            replacement: replacement.to_string(),
            kind: AliasKind::from_code(scan_ints(kind, 1).first().copied().unwrap_or(0)),
        });
    }
}

fn strip_one_space(line: &str) -> &str {
    line.strip_prefix(' ').unwrap_or(line)
}

pub fn write_block(
    kind: BlockKind,
    tag: &str,
    record: &CharacterRecord,
    snapshot: &TransientSnapshot<'_>,
    out: &mut LineWriter,
) {
    match kind {
        BlockKind::Skills => write_indexed(tag, &record.skills, "0 0", out),
        BlockKind::Abilities => write_indexed(tag, &record.ability_ranks, "0", out),
        BlockKind::Feats => write_indexed(tag, &record.feats, "0 0", out),
        BlockKind::KnownSpells => {
            if record.known_spells.is_empty() {
                return;
            }
            out.header(tag);
            for known in &record.known_spells {
                out.raw(&format!("{} {}", known.class, known.spell));
            }
            out.raw("-1 -1");
        }
        BlockKind::ClassLevels => {
            if record.class_levels.iter().all(|level| *level == 0) {
                return;
            }
            out.header(tag);
            for (class, level) in record.class_levels.iter().enumerate() {
                if *level != 0 {
                    out.raw(&format!("{} {}", class, level));
                }
            }
            out.raw("-1 -1");
        }
        BlockKind::ClassFeatPoints => {
            if record.class_feat_points.iter().all(|points| *points == 0) {
                return;
            }
            out.header(tag);
            for (class, points) in record.class_feat_points.iter().enumerate() {
                if *points != 0 {
                    out.raw(&format!("{} {}", class, points));
                }
            }
            out.raw("0");
        }
        BlockKind::CompletedQuests => {
            if record.completed_quests.is_empty() {
                return;
            }
            out.header(tag);
            for vnum in record.completed_quests.iter().take(MAX_COMPLETED_QUESTS) {
                out.raw(&vnum.to_string());
            }
            out.raw("-1");
        }
        BlockKind::Events => {
            if record.events.is_empty() {
                return;
            }
            out.header(tag);
            for event in record.events.iter().take(MAX_EVENTS) {
                out.raw(&format!("{} {}", event.id, event.remaining));
            }
            out.raw("-1 -1");
        }
        BlockKind::Affects => write_affects(tag, record, snapshot, out),
        BlockKind::DamageReduction => write_damage_reduction(tag, record, snapshot, out),
        BlockKind::Aliases => {
            // Blank text lines are skipped on read, so such aliases cannot be stored.
            let aliases: Vec<&Alias> = record
                .aliases
                .iter()
                .filter(|alias| {
                    !alias.alias.trim().is_empty() && !alias.replacement.trim().is_empty()
                })
                .take(MAX_ALIASES)
                .collect();
            if aliases.is_empty() {
                return;
            }
            out.field(tag, &aliases.len().to_string());
            for alias in aliases {
                out.raw(&format!(" {}", single_line(&alias.alias)));
                out.raw(&format!(" {}", single_line(&alias.replacement)));
                out.raw(&alias.kind.code().to_string());
            }
        }
    }
}

fn write_indexed(tag: &str, values: &[i32], sentinel: &str, out: &mut LineWriter) {
    let mut entries = values
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, value)| **value != 0)
        .peekable();
    if entries.peek().is_none() {
        return;
    }
    out.header(tag);
    for (id, value) in entries {
        out.raw(&format!("{} {}", id, value));
    }
    out.raw(sentinel);
}

/// Detached affects first, then the ones still waiting to be reapplied.
fn write_affects(
    tag: &str,
    record: &CharacterRecord,
    snapshot: &TransientSnapshot<'_>,
    out: &mut LineWriter,
) {
    let total = snapshot.affects.len() + record.stored_affects.len();
    if total == 0 {
        return;
    }
    if total > MAX_AFFECT {
        warn!(name = %record.name, total, capacity = MAX_AFFECT, "affect list truncated on save");
    }
    out.header(tag);
    for affect in snapshot
        .affects
        .iter()
        .chain(record.stored_affects.iter())
        .take(MAX_AFFECT)
    {
        let words = affect.bitvector.words();
        out.raw(&format!(
            "{} {} {} {} {} {} {} {} {} {}",
            affect.spell,
            affect.duration,
            affect.modifier,
            affect.location.code(),
            words[0],
            words[1],
            words[2],
            words[3],
            affect.bonus_type,
            affect.specific
        ));
    }
    out.raw("0 0 0 0 0 0 0 0 0 0");
}

/// One entry per source, at most [`MAX_DR_ENTRIES_WRITTEN`] of them.
fn write_damage_reduction(
    tag: &str,
    record: &CharacterRecord,
    snapshot: &TransientSnapshot<'_>,
    out: &mut LineWriter,
) {
    let entries = snapshot
        .damage_reduction
        .unwrap_or(record.damage_reduction.as_slice());
    if entries.is_empty() {
        return;
    }
    out.header(tag);
    let mut seen: HashSet<DrSource> = HashSet::new();
    for entry in entries.iter().take(MAX_DR_ENTRIES_WRITTEN) {
        if !seen.insert(entry.source()) {
            continue;
        }
        out.raw(&format!(
            "1 {} {} {} {}",
            entry.amount, entry.max_damage, entry.spell, entry.feat
        ));
        for bypass in &entry.bypass {
            out.raw(&format!("{} {}", bypass.category, bypass.value));
        }
    }
    out.raw("0 0 0 0 0");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::tagged_line::decode;

    fn read(kind: BlockKind, data: &str) -> (CharacterRecord, ReadIssues, Option<String>) {
        let mut reader = LineReader::new(data);
        let header = reader.next_line().expect("header");
        let (tag, value) = decode(header);
        let mut record = CharacterRecord::new();
        let mut ctx = ReadContext::new("test");
        read_block(kind, tag, value, &mut reader, &mut record, &mut ctx);
        let rest = reader.next_line().map(|line| line.to_string());
        (record, ctx.issues, rest)
    }

    #[test]
    fn skills_skip_out_of_range_ids() {
        let (record, issues, rest) =
            read(BlockKind::Skills, "Skil:\n5 80\n9999 10\n-3 1\n12 40\n0 0\nLevl: 3\n");
        assert_eq!(record.skills[5], 80);
        assert_eq!(record.skills[12], 40);
        assert_eq!(issues.out_of_range, 2);
        assert_eq!(rest.as_deref(), Some("Levl: 3"));
    }

    #[test]
    fn legacy_affect_arities_parse_to_same_structure() {
        let newest = parse_affect(&[7, 3, 2, 1, 32, 0, 0, 0, 0, 0]).expect("10 fields");
        let nine = parse_affect(&[7, 3, 2, 1, 32, 0, 0, 0, 0]).expect("9 fields");
        let eight = parse_affect(&[7, 3, 2, 1, 32, 0, 0, 0]).expect("8 fields");
        let five = parse_affect(&[7, 3, 2, 1, 5]).expect("5 fields");
        assert_eq!(newest, nine);
        assert_eq!(newest, eight);
        assert_eq!(newest, five);
        assert_eq!(newest.location, ApplyLocation::Strength);
        assert!(newest.bitvector.is_set(5));
        assert!(parse_affect(&[7, 3, 2]).is_none());
        assert!(parse_affect(&[7, 3, 2, 1, 0, 0]).is_none());
    }

    #[test]
    fn affects_block_without_sentinel_stops_at_cap() {
        let mut data = String::from("Affs:\n");
        for _ in 0..(MAX_AFFECT * 3) {
            data.push_str("7 3 2 1 0 0 0 0 0 0\n");
        }
        let (record, issues, rest) = read(BlockKind::Affects, &data);
        assert_eq!(record.stored_affects.len(), MAX_AFFECT);
        assert_eq!(issues.unterminated_blocks, 1);
        assert!(rest.is_none());
    }

    #[test]
    fn overfull_affects_block_consumes_its_sentinel() {
        let mut data = String::from("Affs:\n");
        for spell in 1..=(MAX_AFFECT + 1) {
            data.push_str(&format!("{} 3 2 1 0 0 0 0 0 0\n", spell));
        }
        data.push_str("0 0 0 0 0 0 0 0 0 0\nLevl: 3\n");
        let (record, issues, rest) = read(BlockKind::Affects, &data);
        assert_eq!(record.stored_affects.len(), MAX_AFFECT);
        assert_eq!(record.stored_affects[MAX_AFFECT - 1].spell, MAX_AFFECT as i32);
        assert_eq!(issues.unterminated_blocks, 1);
        assert_eq!(issues.unknown_tags, 0);
        assert_eq!(rest.as_deref(), Some("Levl: 3"));
    }

    #[test]
    fn full_block_followed_by_sentinel_is_clean() {
        let mut data = String::from("Evnt:\n");
        for id in 0..MAX_EVENTS {
            data.push_str(&format!("{} 10\n", id));
        }
        data.push_str("-1 -1\n");
        let (record, issues, rest) = read(BlockKind::Events, &data);
        assert_eq!(record.events.len(), MAX_EVENTS);
        assert_eq!(issues.total(), 0);
        assert!(rest.is_none());
    }

    #[test]
    fn missing_sentinel_leaves_next_field_unread() {
        let (record, issues, rest) = read(BlockKind::Skills, "Skil:\n5 80\nLevl: 3\n");
        assert_eq!(record.skills[5], 80);
        assert_eq!(issues.unterminated_blocks, 1);
        assert_eq!(issues.corrupt_lines, 0);
        assert_eq!(rest.as_deref(), Some("Levl: 3"));
    }

    #[test]
    fn truncated_block_ends_at_input_end() {
        let (record, issues, rest) = read(BlockKind::Feats, "Feat:\n3 1\n4 2");
        assert_eq!(record.feats[3], 1);
        assert_eq!(record.feats[4], 2);
        assert_eq!(issues.unterminated_blocks, 1);
        assert!(rest.is_none());
    }

    #[test]
    fn damage_reduction_reads_bypass_lines() {
        let (record, issues, _) = read(
            BlockKind::DamageReduction,
            "DmgR:\n1 5 50 22 0\n1 2\n3 4\n0 0\n1 3 0 0 17\n0 0\n0 0\n0 0\n0 0 0 0 0\n",
        );
        assert_eq!(issues.total(), 0);
        assert_eq!(record.damage_reduction.len(), 2);
        let first = record.damage_reduction[0];
        assert_eq!(first.amount, 5);
        assert_eq!(first.spell, 22);
        assert_eq!(first.bypass[0], DrBypass { category: 1, value: 2 });
        assert_eq!(first.bypass[1], DrBypass { category: 3, value: 4 });
        assert_eq!(record.damage_reduction[1].source(), DrSource::Feat(17));
    }

    #[test]
    fn damage_reduction_writes_one_entry_per_source() {
        let mut record = CharacterRecord::new();
        let stoneskin = DamageReduction {
            amount: 10,
            spell: 22,
            ..DamageReduction::default()
        };
        record.damage_reduction = vec![stoneskin, stoneskin, DamageReduction { feat: 4, ..stoneskin }];
        record.damage_reduction[2].spell = 0;
        let mut out = LineWriter::new();
        write_block(
            BlockKind::DamageReduction,
            "DmgR",
            &record,
            &TransientSnapshot::default(),
            &mut out,
        );
        let text = out.finish();
        assert_eq!(text.lines().filter(|line| line.starts_with("1 ")).count(), 2);
        let (reloaded, _, _) = read(BlockKind::DamageReduction, &text);
        assert_eq!(reloaded.damage_reduction.len(), 2);
    }

    #[test]
    fn aliases_need_all_three_parts() {
        let (record, issues, rest) = read(
            BlockKind::Aliases,
            "Alis: 2\n k\n kill $1\n1\n x\n look\n0\nLevl: 1\n",
        );
        assert_eq!(issues.total(), 0);
        assert_eq!(record.aliases.len(), 2);
        assert_eq!(record.aliases[0].replacement, "kill $1");
        assert_eq!(record.aliases[0].kind, AliasKind::Complex);
        assert_eq!(rest.as_deref(), Some("Levl: 1"));
    }

    #[test]
    fn blank_aliases_are_not_written() {
        let mut record = CharacterRecord::new();
        record.aliases = vec![
            Alias {
                alias: "n".to_string(),
                replacement: String::new(),
                kind: AliasKind::Simple,
            },
            Alias {
                alias: "l".to_string(),
                replacement: "look\nnorth".to_string(),
                kind: AliasKind::Simple,
            },
        ];
        let mut out = LineWriter::new();
        write_block(BlockKind::Aliases, "Alis", &record, &TransientSnapshot::default(), &mut out);
        let text = out.finish();
        assert_eq!(text, "Alis: 1\n l\n look north\n0\n");
        let (reloaded, issues, _) = read(BlockKind::Aliases, &text);
        assert_eq!(issues.total(), 0);
        assert_eq!(reloaded.aliases.len(), 1);
        assert_eq!(reloaded.aliases[0].replacement, "look north");
    }

    #[test]
    fn completed_quests_accept_both_sentinels() {
        let (record, _, _) = read(BlockKind::CompletedQuests, "Qest:\n100\n200\n65535\n");
        assert_eq!(record.completed_quests, vec![100, 200]);
        let (record, _, _) = read(BlockKind::CompletedQuests, "Qest:\n100\n-1\n");
        assert_eq!(record.completed_quests, vec![100]);
    }

    #[test]
    fn class_feat_points_end_on_short_line() {
        let (record, _, rest) = read(BlockKind::ClassFeatPoints, "Cfpt:\n2 5\n4 1\n0\nLevl: 2\n");
        assert_eq!(record.class_feat_points[2], 5);
        assert_eq!(record.class_feat_points[4], 1);
        assert_eq!(rest.as_deref(), Some("Levl: 2"));
    }
}
