use crate::entities::flags::FlagArray;

pub const NUM_SAVING_THROWS: usize = 5;
pub const NUM_DAM_TYPES: usize = 21;
pub const NUM_AFF_FLAGS: usize = 77;

const APPLY_SAVE_BASE: i32 = 20;
const APPLY_RESISTANCE_BASE: i32 = 27;

/// Stat an affect or an item modifier is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplyLocation {
    None,
    Strength,
    Dexterity,
    Intelligence,
    Wisdom,
    Constitution,
    Charisma,
    Age,
    Weight,
    Height,
    Psp,
    Hit,
    Move,
    ArmorClass,
    Hitroll,
    Damroll,
    /// Saving throw slot, 0 (fortitude) through 4 (death).
    Save(usize),
    SpellResistance,
    Size,
    ArmorClassNew,
    /// Damage type 1 (fire) through 20 (water).
    Resistance(usize),
    /// Reserved or unknown code; kept so it survives a save.
    Other(i32),
}

impl ApplyLocation {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ApplyLocation::None,
            1 => ApplyLocation::Strength,
            2 => ApplyLocation::Dexterity,
            3 => ApplyLocation::Intelligence,
            4 => ApplyLocation::Wisdom,
            5 => ApplyLocation::Constitution,
            6 => ApplyLocation::Charisma,
            9 => ApplyLocation::Age,
            10 => ApplyLocation::Weight,
            11 => ApplyLocation::Height,
            12 => ApplyLocation::Psp,
            13 => ApplyLocation::Hit,
            14 => ApplyLocation::Move,
            17 => ApplyLocation::ArmorClass,
            18 => ApplyLocation::Hitroll,
            19 => ApplyLocation::Damroll,
            20..=24 => ApplyLocation::Save((code - APPLY_SAVE_BASE) as usize),
            25 => ApplyLocation::SpellResistance,
            26 => ApplyLocation::Size,
            27 => ApplyLocation::ArmorClassNew,
            28..=47 => ApplyLocation::Resistance((code - APPLY_RESISTANCE_BASE) as usize),
            other => ApplyLocation::Other(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            ApplyLocation::None => 0,
            ApplyLocation::Strength => 1,
            ApplyLocation::Dexterity => 2,
            ApplyLocation::Intelligence => 3,
            ApplyLocation::Wisdom => 4,
            ApplyLocation::Constitution => 5,
            ApplyLocation::Charisma => 6,
            ApplyLocation::Age => 9,
            ApplyLocation::Weight => 10,
            ApplyLocation::Height => 11,
            ApplyLocation::Psp => 12,
            ApplyLocation::Hit => 13,
            ApplyLocation::Move => 14,
            ApplyLocation::ArmorClass => 17,
            ApplyLocation::Hitroll => 18,
            ApplyLocation::Damroll => 19,
            ApplyLocation::Save(index) => APPLY_SAVE_BASE + index as i32,
            ApplyLocation::SpellResistance => 25,
            ApplyLocation::Size => 26,
            ApplyLocation::ArmorClassNew => 27,
            ApplyLocation::Resistance(damage_type) => APPLY_RESISTANCE_BASE + damage_type as i32,
            ApplyLocation::Other(code) => code,
        }
    }
}

/// A timed spell effect on a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affect {
    pub spell: i32,
    pub duration: i32,
    pub modifier: i32,
    pub location: ApplyLocation,
    pub bitvector: FlagArray,
    pub bonus_type: i32,
    pub specific: i32,
}

impl Affect {
    pub fn new(spell: i32, duration: i32, modifier: i32, location: ApplyLocation) -> Self {
        Self {
            spell,
            duration,
            modifier,
            location,
            bitvector: FlagArray::EMPTY,
            bonus_type: 0,
            specific: 0,
        }
    }

    pub fn with_flag(mut self, bit: usize) -> Self {
        self.bitvector.set(bit);
        self
    }
}
