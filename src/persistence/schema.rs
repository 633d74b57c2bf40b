use crate::entities::character::{CharacterRecord, DRUNK, HUNGER, NOTHING, NOWHERE, NO_CLAN, THIRST};
use crate::entities::flags::FlagArray;
use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emit {
    /// Written only when the value differs from its default.
    Sparse,
    /// Written on every save.
    Always,
    /// Accepted on load, never written.
    ReadOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Skills,
    Abilities,
    Feats,
    KnownSpells,
    ClassLevels,
    ClassFeatPoints,
    CompletedQuests,
    Events,
    Affects,
    DamageReduction,
    Aliases,
}

#[derive(Clone, Copy)]
pub enum FieldKind {
    /// `set` reports false when the value does not fit the field.
    Int {
        get: fn(&CharacterRecord) -> i64,
        set: fn(&mut CharacterRecord, i64) -> bool,
        default: i64,
    },
    Text {
        get: fn(&CharacterRecord) -> &str,
        set: fn(&mut CharacterRecord, String),
    },
    LongText {
        get: fn(&CharacterRecord) -> &str,
        set: fn(&mut CharacterRecord, String),
    },
    /// `a/b` pairs such as current/maximum points.
    Pair {
        get: fn(&CharacterRecord) -> (i32, i32),
        set: fn(&mut CharacterRecord, i32, i32),
    },
    Flags {
        get: fn(&CharacterRecord) -> FlagArray,
        set: fn(&mut CharacterRecord, FlagArray),
    },
    Block(BlockKind),
}

#[derive(Clone, Copy)]
pub struct FieldSpec {
    pub tag: &'static str,
    pub kind: FieldKind,
    pub emit: Emit,
    /// Skipped on save for characters at or above the immortal level, whose
    /// values are regenerated on load.
    pub mortal_only: bool,
}

impl FieldSpec {
    fn new(tag: &'static str, kind: FieldKind) -> Self {
        Self {
            tag,
            kind,
            emit: Emit::Sparse,
            mortal_only: false,
        }
    }

    fn int(
        tag: &'static str,
        default: i64,
        get: fn(&CharacterRecord) -> i64,
        set: fn(&mut CharacterRecord, i64) -> bool,
    ) -> Self {
        Self::new(tag, FieldKind::Int { get, set, default })
    }

    fn text(
        tag: &'static str,
        get: fn(&CharacterRecord) -> &str,
        set: fn(&mut CharacterRecord, String),
    ) -> Self {
        Self::new(tag, FieldKind::Text { get, set })
    }

    fn long_text(
        tag: &'static str,
        get: fn(&CharacterRecord) -> &str,
        set: fn(&mut CharacterRecord, String),
    ) -> Self {
        Self::new(tag, FieldKind::LongText { get, set })
    }

    fn pair(
        tag: &'static str,
        get: fn(&CharacterRecord) -> (i32, i32),
        set: fn(&mut CharacterRecord, i32, i32),
    ) -> Self {
        Self::new(tag, FieldKind::Pair { get, set })
    }

    fn flags(
        tag: &'static str,
        get: fn(&CharacterRecord) -> FlagArray,
        set: fn(&mut CharacterRecord, FlagArray),
    ) -> Self {
        Self::new(tag, FieldKind::Flags { get, set })
    }

    fn block(tag: &'static str, kind: BlockKind) -> Self {
        Self::new(tag, FieldKind::Block(kind))
    }

    fn always(mut self) -> Self {
        self.emit = Emit::Always;
        self
    }

    fn read_only(mut self) -> Self {
        self.emit = Emit::ReadOnly;
        self
    }

    fn mortal_only(mut self) -> Self {
        self.mortal_only = true;
        self
    }
}

macro_rules! int_field {
    ($tag:literal = $default:expr; $($field:tt)+) => {
        FieldSpec::int($tag, $default as i64, |r| r.$($field)+ as i64, |r, v| store(&mut r.$($field)+, v))
    };
    ($tag:literal; $($field:tt)+) => {
        int_field!($tag = 0; $($field)+)
    };
}

/// Narrows a parsed value into its field, leaving the field alone when the
/// value is out of range.
fn store<T: TryFrom<i64>>(slot: &mut T, value: i64) -> bool {
    match T::try_from(value) {
        Ok(value) => {
            *slot = value;
            true
        }
        Err(_) => false,
    }
}

macro_rules! text_field {
    ($tag:literal; $field:ident) => {
        FieldSpec::text($tag, |r| r.$field.as_str(), |r, v| r.$field = v)
    };
}

pub struct Schema {
    fields: Vec<FieldSpec>,
    by_tag: HashMap<&'static str, usize>,
}

impl Schema {
    /// Fields in write order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn lookup(&self, tag: &str) -> Option<&FieldSpec> {
        self.by_tag.get(tag).map(|index| &self.fields[*index])
    }
}

static SCHEMA: OnceLock<Schema> = OnceLock::new();

pub fn schema() -> &'static Schema {
    SCHEMA.get_or_init(|| {
        let fields = build_fields();
        let by_tag = fields
            .iter()
            .enumerate()
            .map(|(index, spec)| (spec.tag, index))
            .collect();
        Schema { fields, by_tag }
    })
}

fn build_fields() -> Vec<FieldSpec> {
    vec![
        text_field!("Name"; name).always(),
        text_field!("Pass"; password),
        text_field!("Acct"; account),
        text_field!("Titl"; title),
        FieldSpec::long_text("Todo", |r| r.todo.as_str(), |r, v| r.todo = v),
        FieldSpec::long_text("Desc", |r| r.description.as_str(), |r, v| r.description = v),
        FieldSpec::long_text("BGrd", |r| r.background.as_str(), |r, v| r.background = v),
        text_field!("PfIn"; poofin),
        text_field!("PfOt"; poofout),
        int_field!("Sex "; sex),
        int_field!("Clas"; class),
        int_field!("Race"; race),
        int_field!("Size" = -1; size),
        int_field!("Levl"; level),
        int_field!("Id  "; id).always(),
        int_field!("Brth"; birth).always(),
        int_field!("Plyd"; played).always(),
        int_field!("Last"; last_logon).always(),
        int_field!("Lmot"; last_motd),
        int_field!("Lnew"; last_news),
        text_field!("Host"; host),
        int_field!("Hite"; height),
        int_field!("Wate"; weight),
        int_field!("Alin"; alignment),
        int_field!("Tmpl"; template),
        FieldSpec::flags("Act ", |r| r.plr_flags, |r, v| r.plr_flags = v),
        FieldSpec::flags("Aff ", |r| r.aff_flags, |r, v| r.aff_flags = v),
        FieldSpec::flags("Pref", |r| r.prf_flags, |r, v| r.prf_flags = v),
        int_field!("Thr1"; saves[0]),
        int_field!("Thr2"; saves[1]),
        int_field!("Thr3"; saves[2]),
        int_field!("Thr4"; saves[3]),
        int_field!("Thr5"; saves[4]),
        int_field!("Res1"; resistances[1]),
        int_field!("Res2"; resistances[2]),
        int_field!("Res3"; resistances[3]),
        int_field!("Res4"; resistances[4]),
        int_field!("Res5"; resistances[5]),
        int_field!("Res6"; resistances[6]),
        int_field!("Res7"; resistances[7]),
        int_field!("Res8"; resistances[8]),
        int_field!("Res9"; resistances[9]),
        int_field!("ResA"; resistances[10]),
        int_field!("ResB"; resistances[11]),
        int_field!("ResC"; resistances[12]),
        int_field!("ResD"; resistances[13]),
        int_field!("ResE"; resistances[14]),
        int_field!("ResF"; resistances[15]),
        int_field!("ResG"; resistances[16]),
        int_field!("ResH"; resistances[17]),
        int_field!("ResI"; resistances[18]),
        int_field!("ResJ"; resistances[19]),
        int_field!("ResK"; resistances[20]),
        int_field!("Wimp"; wimp_level),
        int_field!("Frez"; freeze_level),
        int_field!("Invs"; invis_level),
        int_field!("Room" = NOWHERE; load_room),
        int_field!("Badp"; bad_passwords),
        int_field!("Lern"; practices),
        int_field!("Trns"; trains),
        int_field!("Bost"; boosts),
        int_field!("Dom1"; domain_1),
        int_field!("Dom2"; domain_2),
        int_field!("SSch"; specialty_school),
        int_field!("PCAr" = -1; preferred_arcane),
        int_field!("PCDi" = -1; preferred_divine),
        int_field!("Ftpt"; feat_points),
        FieldSpec::block("Cfpt", BlockKind::ClassFeatPoints),
        int_field!("Efpt"; epic_feat_points),
        int_field!("Hung"; conditions[HUNGER]).mortal_only(),
        int_field!("Thir"; conditions[THIRST]).mortal_only(),
        int_field!("Drnk"; conditions[DRUNK]).mortal_only(),
        FieldSpec::pair(
            "Hit ",
            |r| (r.hit, r.max_hit),
            |r, a, b| {
                r.hit = a;
                r.max_hit = b;
            },
        ),
        FieldSpec::pair(
            "PSP ",
            |r| (r.psp, r.max_psp),
            |r, a, b| {
                r.psp = a;
                r.max_psp = b;
            },
        ),
        FieldSpec::pair(
            "Move",
            |r| (r.move_points, r.max_move),
            |r, a, b| {
                r.move_points = a;
                r.max_move = b;
            },
        ),
        FieldSpec::pair(
            "Str ",
            |r| (r.attributes.strength, r.attributes.strength_add),
            |r, a, b| {
                r.attributes.strength = a;
                r.attributes.strength_add = b;
            },
        ),
        int_field!("Int "; attributes.intelligence),
        int_field!("Wis "; attributes.wisdom),
        int_field!("Dex "; attributes.dexterity),
        int_field!("Con "; attributes.constitution),
        int_field!("Cha "; attributes.charisma),
        int_field!("Ac  "; armor_class),
        int_field!("Gold"; gold),
        int_field!("Bank"; bank_gold),
        int_field!("Exp "; experience),
        int_field!("Hrol"; hitroll),
        int_field!("Drol"; damroll),
        int_field!("SpRs"; spell_res),
        int_field!("Mrph"; morphed),
        int_field!("Olc " = NOWHERE; olc_zone),
        int_field!("Page" = 40; page_length),
        int_field!("ScrW" = 80; screen_width),
        int_field!("Qstp"; quest_points),
        int_field!("Qpnt"; quest_points).read_only(),
        int_field!("Qcnt"; quest_counters[0]),
        int_field!("Qcn1"; quest_counters[1]),
        int_field!("Qcn2"; quest_counters[2]),
        FieldSpec::block("Qest", BlockKind::CompletedQuests),
        int_field!("Qcur" = NOTHING; current_quests[0]),
        int_field!("Qcu1" = NOTHING; current_quests[1]),
        int_field!("Qcu2" = NOTHING; current_quests[2]),
        int_field!("DipT"; dip_timer),
        int_field!("Cln " = NO_CLAN; clan),
        int_field!("Clrk"; clan_rank),
        int_field!("CPts"; clan_points),
        int_field!("PreB" = -1; premade_build),
        FieldSpec::block("Skil", BlockKind::Skills).mortal_only(),
        FieldSpec::block("Ablt", BlockKind::Abilities).mortal_only(),
        FieldSpec::block("Feat", BlockKind::Feats),
        FieldSpec::block("KnSp", BlockKind::KnownSpells),
        FieldSpec::block("CLvl", BlockKind::ClassLevels),
        FieldSpec::block("Evnt", BlockKind::Events),
        FieldSpec::block("Affs", BlockKind::Affects),
        FieldSpec::block("DmgR", BlockKind::DamageReduction),
        FieldSpec::block("Alis", BlockKind::Aliases),
    ]
}
