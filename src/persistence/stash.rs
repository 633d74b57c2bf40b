use crate::entities::affects::Affect;
use crate::entities::character::{CharacterRecord, StashState};
use crate::entities::damage_reduction::DamageReduction;
use crate::entities::equipment::{Item, WearSlot, WEAR_SLOTS};
use tracing::{error, warn};

/// Capacity of the affect snapshot taken for a save.
pub const MAX_AFFECT: usize = 32;

/// Transient state pulled off a record, as seen by the record writer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransientSnapshot<'a> {
    pub affects: &'a [Affect],
    /// The full damage-reduction list, spell-linked entries included. `None`
    /// means the record's own list is complete.
    pub damage_reduction: Option<&'a [DamageReduction]>,
}

/// Holds a record in the detached-for-save state. Worn items, active affects
/// and spell-linked damage reduction are restored when the guard drops,
/// whichever way the save ends.
pub struct TransientStash<'a> {
    record: &'a mut CharacterRecord,
    equipment: Vec<(WearSlot, Item)>,
    affects: Vec<Affect>,
    damage_reduction: Vec<DamageReduction>,
}

impl<'a> TransientStash<'a> {
    pub fn detach(record: &'a mut CharacterRecord) -> Self {
        let equipment: Vec<(WearSlot, Item)> = WEAR_SLOTS
            .iter()
            .filter_map(|slot| record.unequip(*slot).map(|item| (*slot, item)))
            .collect();

        let active = record.affects().len();
        if active > MAX_AFFECT {
            warn!(
                name = %record.name,
                active,
                capacity = MAX_AFFECT,
                "affect snapshot full; overflow stays attached and is not saved"
            );
        }
        let affects = record.take_affects(MAX_AFFECT);

        let damage_reduction = std::mem::take(&mut record.damage_reduction);
        record.damage_reduction = damage_reduction
            .iter()
            .filter(|entry| !entry.is_spell_linked())
            .copied()
            .collect();

        record.set_stash_state(StashState::DetachedForSave);
        record.affect_total();
        Self {
            record,
            equipment,
            affects,
            damage_reduction,
        }
    }

    pub fn record(&self) -> &CharacterRecord {
        self.record
    }

    pub fn affects(&self) -> &[Affect] {
        &self.affects
    }

    pub fn held_items(&self) -> usize {
        self.equipment.len()
    }

    pub fn snapshot(&self) -> TransientSnapshot<'_> {
        TransientSnapshot {
            affects: &self.affects,
            damage_reduction: Some(&self.damage_reduction),
        }
    }
}

impl Drop for TransientStash<'_> {
    fn drop(&mut self) {
        self.record.damage_reduction = std::mem::take(&mut self.damage_reduction);
        self.record.restore_affects(std::mem::take(&mut self.affects));
        for (slot, item) in self.equipment.drain(..) {
            if let Err(item) = self.record.equip(slot, item) {
                error!(
                    name = %self.record.name,
                    vnum = item.vnum,
                    ?slot,
                    "slot refilled while detached; item dropped"
                );
            }
        }
        self.record.set_stash_state(StashState::Attached);
    }
}
