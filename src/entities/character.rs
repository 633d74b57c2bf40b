use crate::entities::affects::{Affect, ApplyLocation, NUM_DAM_TYPES, NUM_SAVING_THROWS};
use crate::entities::damage_reduction::DamageReduction;
use crate::entities::equipment::{Equipment, Item, WearSlot};
use crate::entities::flags::FlagArray;

pub const MAX_SKILLS: usize = 600;
pub const MAX_ABILITIES: usize = 200;
pub const NUM_FEATS: usize = 1200;
pub const MAX_CLASSES: usize = 30;
pub const NUM_CONDITIONS: usize = 3;
pub const NUM_QUEST_SLOTS: usize = 3;

pub const NOWHERE: i32 = -1;
pub const NOTHING: i32 = -1;
pub const NO_CLAN: i32 = 65535;

pub const DRUNK: usize = 0;
pub const HUNGER: usize = 1;
pub const THIRST: usize = 2;

pub const PLR_FROZEN: usize = 2;
pub const PLR_DELETED: usize = 10;
pub const PLR_NOWIZLIST: usize = 12;
pub const PLR_NODELETE: usize = 13;
pub const PLR_CRYO: usize = 15;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Attributes {
    pub strength: i32,
    pub strength_add: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub charisma: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownSpell {
    pub class: i32,
    pub spell: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledEvent {
    pub id: i32,
    pub remaining: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasKind {
    Simple,
    Complex,
}

impl AliasKind {
    pub fn from_code(code: i64) -> Self {
        if code == 1 {
            AliasKind::Complex
        } else {
            AliasKind::Simple
        }
    }

    pub fn code(self) -> i32 {
        match self {
            AliasKind::Simple => 0,
            AliasKind::Complex => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub alias: String,
    pub replacement: String,
    pub kind: AliasKind,
}

/// Whether the transient runtime state is currently pulled off for a save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StashState {
    #[default]
    Attached,
    DetachedForSave,
}

/// Values after equipment and active affects are layered over the base.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EffectiveStats {
    pub attributes: Attributes,
    pub max_hit: i32,
    pub max_psp: i32,
    pub max_move: i32,
    pub armor_class: i32,
    pub hitroll: i32,
    pub damroll: i32,
    pub spell_res: i32,
    pub size: i32,
    pub weight: i32,
    pub height: i32,
    pub saves: [i32; NUM_SAVING_THROWS],
    pub resistances: [i32; NUM_DAM_TYPES],
    pub aff_flags: FlagArray,
}

impl EffectiveStats {
    fn apply(&mut self, location: ApplyLocation, modifier: i32) {
        match location {
            ApplyLocation::Strength => self.attributes.strength += modifier,
            ApplyLocation::Dexterity => self.attributes.dexterity += modifier,
            ApplyLocation::Intelligence => self.attributes.intelligence += modifier,
            ApplyLocation::Wisdom => self.attributes.wisdom += modifier,
            ApplyLocation::Constitution => self.attributes.constitution += modifier,
            ApplyLocation::Charisma => self.attributes.charisma += modifier,
            ApplyLocation::Weight => self.weight += modifier,
            ApplyLocation::Height => self.height += modifier,
            ApplyLocation::Psp => self.max_psp += modifier,
            ApplyLocation::Hit => self.max_hit += modifier,
            ApplyLocation::Move => self.max_move += modifier,
            ApplyLocation::ArmorClass | ApplyLocation::ArmorClassNew => {
                self.armor_class += modifier
            }
            ApplyLocation::Hitroll => self.hitroll += modifier,
            ApplyLocation::Damroll => self.damroll += modifier,
            ApplyLocation::Save(index) => {
                if let Some(save) = self.saves.get_mut(index) {
                    *save += modifier;
                }
            }
            ApplyLocation::SpellResistance => self.spell_res += modifier,
            ApplyLocation::Size => self.size += modifier,
            ApplyLocation::Resistance(damage_type) => {
                if let Some(resistance) = self.resistances.get_mut(damage_type) {
                    *resistance += modifier;
                }
            }
            ApplyLocation::None | ApplyLocation::Age | ApplyLocation::Other(_) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterRecord {
    pub name: String,
    pub password: String,
    pub account: String,
    pub title: String,
    pub todo: String,
    pub description: String,
    pub background: String,
    pub poofin: String,
    pub poofout: String,
    pub host: String,

    pub id: i64,
    pub birth: i64,
    pub played: i64,
    pub last_logon: i64,
    pub last_motd: i32,
    pub last_news: i32,

    pub sex: i32,
    pub class: i32,
    pub race: i32,
    pub size: i32,
    pub level: i32,
    pub height: i32,
    pub weight: i32,
    pub alignment: i32,
    pub template: i32,
    pub premade_build: i32,

    pub plr_flags: FlagArray,
    pub aff_flags: FlagArray,
    pub prf_flags: FlagArray,

    pub saves: [i32; NUM_SAVING_THROWS],
    pub resistances: [i32; NUM_DAM_TYPES],

    pub wimp_level: i32,
    pub freeze_level: i32,
    pub invis_level: i32,
    pub load_room: i32,
    pub bad_passwords: i32,

    pub practices: i32,
    pub trains: i32,
    pub boosts: i32,
    pub domain_1: i32,
    pub domain_2: i32,
    pub specialty_school: i32,
    pub preferred_arcane: i32,
    pub preferred_divine: i32,
    pub feat_points: i32,
    pub epic_feat_points: i32,
    pub class_feat_points: [i32; MAX_CLASSES],

    pub conditions: [i32; NUM_CONDITIONS],
    pub hit: i32,
    pub max_hit: i32,
    pub psp: i32,
    pub max_psp: i32,
    pub move_points: i32,
    pub max_move: i32,
    pub attributes: Attributes,

    pub armor_class: i32,
    pub hitroll: i32,
    pub damroll: i32,
    pub spell_res: i32,
    pub morphed: i32,
    pub gold: i32,
    pub bank_gold: i32,
    pub experience: i64,

    pub olc_zone: i32,
    pub page_length: i32,
    pub screen_width: i32,

    pub quest_points: i32,
    pub current_quests: [i32; NUM_QUEST_SLOTS],
    pub quest_counters: [i32; NUM_QUEST_SLOTS],
    pub completed_quests: Vec<i32>,
    pub dip_timer: i32,
    pub clan: i32,
    pub clan_rank: i32,
    pub clan_points: i32,

    pub skills: Vec<i32>,
    pub ability_ranks: Vec<i32>,
    pub feats: Vec<i32>,
    pub known_spells: Vec<KnownSpell>,
    pub class_levels: [i32; MAX_CLASSES],
    pub events: Vec<ScheduledEvent>,
    /// Affects read back from disk; they become active only when the
    /// gameplay layer calls [`CharacterRecord::reapply_stored_affects`].
    pub stored_affects: Vec<Affect>,
    pub damage_reduction: Vec<DamageReduction>,
    pub aliases: Vec<Alias>,

    affected: Vec<Affect>,
    equipment: Equipment,
    effective: EffectiveStats,
    stash_state: StashState,
}

impl Default for CharacterRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl CharacterRecord {
    pub fn new() -> Self {
        let mut record = Self {
            name: String::new(),
            password: String::new(),
            account: String::new(),
            title: String::new(),
            todo: String::new(),
            description: String::new(),
            background: String::new(),
            poofin: String::new(),
            poofout: String::new(),
            host: String::new(),
            id: 0,
            birth: 0,
            played: 0,
            last_logon: 0,
            last_motd: 0,
            last_news: 0,
            sex: 0,
            class: 0,
            race: 0,
            size: -1,
            level: 0,
            height: 0,
            weight: 0,
            alignment: 0,
            template: 0,
            premade_build: -1,
            plr_flags: FlagArray::EMPTY,
            aff_flags: FlagArray::EMPTY,
            prf_flags: FlagArray::EMPTY,
            saves: [0; NUM_SAVING_THROWS],
            resistances: [0; NUM_DAM_TYPES],
            wimp_level: 0,
            freeze_level: 0,
            invis_level: 0,
            load_room: NOWHERE,
            bad_passwords: 0,
            practices: 0,
            trains: 0,
            boosts: 0,
            domain_1: 0,
            domain_2: 0,
            specialty_school: 0,
            preferred_arcane: -1,
            preferred_divine: -1,
            feat_points: 0,
            epic_feat_points: 0,
            class_feat_points: [0; MAX_CLASSES],
            conditions: [0; NUM_CONDITIONS],
            hit: 0,
            max_hit: 0,
            psp: 0,
            max_psp: 0,
            move_points: 0,
            max_move: 0,
            attributes: Attributes::default(),
            armor_class: 0,
            hitroll: 0,
            damroll: 0,
            spell_res: 0,
            morphed: 0,
            gold: 0,
            bank_gold: 0,
            experience: 0,
            olc_zone: NOWHERE,
            page_length: 40,
            screen_width: 80,
            quest_points: 0,
            current_quests: [NOTHING; NUM_QUEST_SLOTS],
            quest_counters: [0; NUM_QUEST_SLOTS],
            completed_quests: Vec::new(),
            dip_timer: 0,
            clan: NO_CLAN,
            clan_rank: 0,
            clan_points: 0,
            skills: vec![0; MAX_SKILLS],
            ability_ranks: vec![0; MAX_ABILITIES + 1],
            feats: vec![0; NUM_FEATS],
            known_spells: Vec::new(),
            class_levels: [0; MAX_CLASSES],
            events: Vec::new(),
            stored_affects: Vec::new(),
            damage_reduction: Vec::new(),
            aliases: Vec::new(),
            affected: Vec::new(),
            equipment: Equipment::default(),
            effective: EffectiveStats::default(),
            stash_state: StashState::Attached,
        };
        record.affect_total();
        record
    }

    pub fn named(name: impl Into<String>) -> Self {
        let mut record = Self::new();
        record.name = name.into();
        record
    }

    /// Drops every field, runtime state included, back to its default.
    pub fn reset_to_defaults(&mut self) {
        *self = Self::new();
    }

    pub fn is_flagged(&self, plr_bit: usize) -> bool {
        self.plr_flags.is_set(plr_bit)
    }

    pub fn effective(&self) -> &EffectiveStats {
        &self.effective
    }

    pub fn affects(&self) -> &[Affect] {
        &self.affected
    }

    pub fn equipment(&self) -> &Equipment {
        &self.equipment
    }

    pub fn stash_state(&self) -> StashState {
        self.stash_state
    }

    pub(crate) fn set_stash_state(&mut self, state: StashState) {
        self.stash_state = state;
    }

    pub fn add_affect(&mut self, affect: Affect) {
        self.affected.push(affect);
        self.affect_total();
    }

    pub fn remove_affect(&mut self, index: usize) -> Option<Affect> {
        if index >= self.affected.len() {
            return None;
        }
        let affect = self.affected.remove(index);
        self.affect_total();
        Some(affect)
    }

    /// Removes the first `limit` active affects, leaving the rest attached.
    pub fn take_affects(&mut self, limit: usize) -> Vec<Affect> {
        let count = limit.min(self.affected.len());
        let taken = self.affected.drain(..count).collect();
        self.affect_total();
        taken
    }

    /// Reinserts previously taken affects ahead of anything still attached.
    pub fn restore_affects(&mut self, affects: Vec<Affect>) {
        let remaining = std::mem::replace(&mut self.affected, affects);
        self.affected.extend(remaining);
        self.affect_total();
    }

    /// Moves affects loaded from disk onto the live character.
    pub fn reapply_stored_affects(&mut self) -> usize {
        let stored = std::mem::take(&mut self.stored_affects);
        let count = stored.len();
        self.affected.extend(stored);
        self.affect_total();
        count
    }

    pub fn equip(&mut self, slot: WearSlot, item: Item) -> Result<(), Item> {
        self.equipment.equip(slot, item)?;
        self.affect_total();
        Ok(())
    }

    pub fn unequip(&mut self, slot: WearSlot) -> Option<Item> {
        let item = self.equipment.unequip(slot)?;
        self.affect_total();
        Some(item)
    }

    /// Rebuilds the effective values from the base fields, worn items and
    /// active affects.
    pub fn affect_total(&mut self) {
        let mut effective = EffectiveStats {
            attributes: self.attributes,
            max_hit: self.max_hit,
            max_psp: self.max_psp,
            max_move: self.max_move,
            armor_class: self.armor_class,
            hitroll: self.hitroll,
            damroll: self.damroll,
            spell_res: self.spell_res,
            size: self.size,
            weight: self.weight,
            height: self.height,
            saves: self.saves,
            resistances: self.resistances,
            aff_flags: self.aff_flags,
        };
        for (_, item) in self.equipment.worn() {
            for apply in &item.applies {
                effective.apply(apply.location, apply.modifier);
            }
            effective.aff_flags.union_with(&item.aff_flags);
        }
        for affect in &self.affected {
            effective.apply(affect.location, affect.modifier);
            effective.aff_flags.union_with(&affect.bitvector);
        }
        self.effective = effective;
    }
}
