pub mod affects;
pub mod character;
pub mod damage_reduction;
pub mod equipment;
pub mod flags;
