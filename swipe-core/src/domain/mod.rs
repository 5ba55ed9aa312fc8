mod action;
mod traits;

pub use action::{Action, ActionKind, AppName};
pub use traits::{
    BehaviourTraits, PhotoPersonaBundle, PhotoPersonaProfile, ProfileTagsBlock, QaSectionsBlock,
    RawTextBlock,
};
