pub(crate) mod helpers;
pub(crate) mod placements;
pub(crate) mod synth;
pub(crate) mod verify;
