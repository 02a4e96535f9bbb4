//! Static table of known modes and the states each of them accepts.
//!
//! Every lookup returns `None` for unknown input; turning that into an
//! argument error is the caller's job.

mod types;

pub use types::{ModeDescriptor, State, StateEntry, SystemMode};

static DEVICE_OPTIMIZE_STATES: &[StateEntry] = &[
    StateEntry {
        state: State::Video,
        name: "VIDEO",
        display: "video",
    },
    StateEntry {
        state: State::Game,
        name: "GAME",
        display: "game",
    },
];

static CATALOG: &[ModeDescriptor] = &[ModeDescriptor {
    mode: SystemMode::DeviceOptimize,
    name: "DEVICE_OPTIMIZE",
    default_state: State::Video,
    states: DEVICE_OPTIMIZE_STATES,
}];

pub struct ModeCatalog;

impl ModeCatalog {
    pub fn descriptors() -> &'static [ModeDescriptor] {
        CATALOG
    }

    pub fn modes() -> impl Iterator<Item = SystemMode> {
        CATALOG.iter().map(|d| d.mode)
    }

    pub fn descriptor(mode: SystemMode) -> Option<&'static ModeDescriptor> {
        CATALOG.iter().find(|d| d.mode == mode)
    }

    pub fn is_valid_mode(mode: SystemMode) -> bool {
        Self::descriptor(mode).is_some()
    }

    pub fn mode_name(mode: SystemMode) -> Option<&'static str> {
        Self::descriptor(mode).map(|d| d.name)
    }

    /// Exact, case-sensitive match on the section name.
    pub fn mode_from_name(name: &str) -> Option<SystemMode> {
        CATALOG.iter().find(|d| d.name == name).map(|d| d.mode)
    }

    pub fn mode_from_raw(raw: u32) -> Option<SystemMode> {
        CATALOG
            .iter()
            .find(|d| d.mode.as_raw() == raw)
            .map(|d| d.mode)
    }

    pub fn is_valid_state(mode: SystemMode, state: State) -> bool {
        Self::descriptor(mode)
            .and_then(|d| d.entry(state))
            .is_some()
    }

    pub fn state_name(mode: SystemMode, state: State) -> Option<&'static str> {
        Self::descriptor(mode)
            .and_then(|d| d.entry(state))
            .map(|e| e.name)
    }

    pub fn state_display_name(mode: SystemMode, state: State) -> Option<&'static str> {
        Self::descriptor(mode)
            .and_then(|d| d.entry(state))
            .map(|e| e.display)
    }

    /// Accepts either the persisted (`GAME`) or the display (`game`) encoding.
    /// Anything else, including other casings, is unknown.
    pub fn state_from_name(mode: SystemMode, name: &str) -> Option<State> {
        Self::descriptor(mode)?
            .states
            .iter()
            .find(|e| e.name == name || e.display == name)
            .map(|e| e.state)
    }

    /// Resolves a raw state value, valid only if `mode` accepts it.
    pub fn state_from_raw(mode: SystemMode, raw: u32) -> Option<State> {
        Self::descriptor(mode)?
            .states
            .iter()
            .find(|e| e.state.as_raw() == raw)
            .map(|e| e.state)
    }

    pub fn default_state(mode: SystemMode) -> Option<State> {
        Self::descriptor(mode).map(|d| d.default_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_names_are_case_sensitive() {
        assert_eq!(
            ModeCatalog::mode_from_name("DEVICE_OPTIMIZE"),
            Some(SystemMode::DeviceOptimize)
        );
        assert_eq!(ModeCatalog::mode_from_name("device_optimize"), None);
        assert_eq!(ModeCatalog::mode_from_name("DEVICE_OPT"), None);
        assert_eq!(ModeCatalog::mode_from_name(""), None);
    }

    #[test]
    fn test_state_accepts_both_encodings() {
        let mode = SystemMode::DeviceOptimize;
        assert_eq!(ModeCatalog::state_from_name(mode, "GAME"), Some(State::Game));
        assert_eq!(ModeCatalog::state_from_name(mode, "video"), Some(State::Video));
        assert_eq!(ModeCatalog::state_from_name(mode, "Video"), None);
        assert_eq!(ModeCatalog::state_from_name(mode, "vid"), None);
    }

    #[test]
    fn test_state_encodings() {
        let mode = SystemMode::DeviceOptimize;
        assert_eq!(ModeCatalog::state_name(mode, State::Game), Some("GAME"));
        assert_eq!(
            ModeCatalog::state_display_name(mode, State::Video),
            Some("video")
        );
        assert!(ModeCatalog::is_valid_state(mode, State::Video));
        assert_eq!(ModeCatalog::default_state(mode), Some(State::Video));
    }

    #[test]
    fn test_raw_lookups() {
        assert_eq!(ModeCatalog::mode_from_raw(1), Some(SystemMode::DeviceOptimize));
        assert_eq!(ModeCatalog::mode_from_raw(0), None);
        assert_eq!(ModeCatalog::mode_from_raw(7), None);

        let mode = SystemMode::DeviceOptimize;
        assert_eq!(ModeCatalog::state_from_raw(mode, 2), Some(State::Game));
        assert_eq!(ModeCatalog::state_from_raw(mode, 9), None);
    }

    #[test]
    fn test_every_descriptor_default_is_valid() {
        for d in ModeCatalog::descriptors() {
            assert!(ModeCatalog::is_valid_state(d.mode, d.default_state), "{}", d.name);
            assert!(!d.states.is_empty());
        }
    }

    #[test]
    fn test_mode_display_uses_catalog_name() {
        assert_eq!(SystemMode::DeviceOptimize.to_string(), "DEVICE_OPTIMIZE");
    }
}
