pub const MAX_DR_BYPASS: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrBypass {
    pub category: i32,
    pub value: i32,
}

/// One damage-reduction entry. Entries with a non-zero `spell` are created by
/// an active spell and vanish with it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DamageReduction {
    pub amount: i32,
    pub max_damage: i32,
    pub spell: i32,
    pub feat: i32,
    pub bypass: [DrBypass; MAX_DR_BYPASS],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrSource {
    Spell(i32),
    Feat(i32),
}

impl DamageReduction {
    pub fn is_spell_linked(&self) -> bool {
        self.spell != 0
    }

    pub fn source(&self) -> DrSource {
        if self.is_spell_linked() {
            DrSource::Spell(self.spell)
        } else {
            DrSource::Feat(self.feat)
        }
    }
}
