use crate::entities::affects::ApplyLocation;
use crate::entities::flags::FlagArray;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WearSlot {
    Light,
    FingerRight,
    FingerLeft,
    Neck1,
    Neck2,
    Body,
    Head,
    Legs,
    Feet,
    Hands,
    Arms,
    Shield,
    About,
    Waist,
    WristRight,
    WristLeft,
    Wield1,
    Hold1,
    Wield2,
    Hold2,
    WieldTwoHanded,
    HoldTwoHanded,
    Face,
}

pub const NUM_WEARS: usize = 23;

pub const WEAR_SLOTS: [WearSlot; NUM_WEARS] = [
    WearSlot::Light,
    WearSlot::FingerRight,
    WearSlot::FingerLeft,
    WearSlot::Neck1,
    WearSlot::Neck2,
    WearSlot::Body,
    WearSlot::Head,
    WearSlot::Legs,
    WearSlot::Feet,
    WearSlot::Hands,
    WearSlot::Arms,
    WearSlot::Shield,
    WearSlot::About,
    WearSlot::Waist,
    WearSlot::WristRight,
    WearSlot::WristLeft,
    WearSlot::Wield1,
    WearSlot::Hold1,
    WearSlot::Wield2,
    WearSlot::Hold2,
    WearSlot::WieldTwoHanded,
    WearSlot::HoldTwoHanded,
    WearSlot::Face,
];

impl WearSlot {
    pub fn index(self) -> usize {
        WEAR_SLOTS
            .iter()
            .position(|slot| *slot == self)
            .unwrap_or(0)
    }

    pub fn from_index(index: usize) -> Option<Self> {
        WEAR_SLOTS.get(index).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemApply {
    pub location: ApplyLocation,
    pub modifier: i32,
}

/// A worn object. Only the parts that feed derived stats live here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub vnum: i32,
    pub name: String,
    pub applies: Vec<ItemApply>,
    pub aff_flags: FlagArray,
}

impl Item {
    pub fn new(vnum: i32, name: impl Into<String>) -> Self {
        Self {
            vnum,
            name: name.into(),
            applies: Vec::new(),
            aff_flags: FlagArray::EMPTY,
        }
    }

    pub fn with_apply(mut self, location: ApplyLocation, modifier: i32) -> Self {
        self.applies.push(ItemApply { location, modifier });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equipment {
    slots: Vec<Option<Item>>,
}

impl Default for Equipment {
    fn default() -> Self {
        Self {
            slots: vec![None; NUM_WEARS],
        }
    }
}

impl Equipment {
    pub fn slot(&self, slot: WearSlot) -> Option<&Item> {
        self.slots.get(slot.index()).and_then(|entry| entry.as_ref())
    }

    /// Puts `item` in `slot`, handing it back if the slot is taken.
    pub fn equip(&mut self, slot: WearSlot, item: Item) -> Result<(), Item> {
        match self.slots.get_mut(slot.index()) {
            Some(entry @ None) => {
                *entry = Some(item);
                Ok(())
            }
            _ => Err(item),
        }
    }

    pub fn unequip(&mut self, slot: WearSlot) -> Option<Item> {
        self.slots.get_mut(slot.index()).and_then(|entry| entry.take())
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|entry| entry.is_none())
    }

    pub fn worn(&self) -> impl Iterator<Item = (WearSlot, &Item)> + '_ {
        WEAR_SLOTS
            .iter()
            .zip(self.slots.iter())
            .filter_map(|(slot, entry)| entry.as_ref().map(|item| (*slot, item)))
    }
}
