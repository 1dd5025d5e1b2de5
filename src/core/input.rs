use std::time::Instant;

use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::game::note::Lane;
use crate::game::state::Difficulty;

/// Non-lane keys. What they do depends on where the game is, so they are resolved
/// against the session rather than mapped straight to commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuKey {
    Confirm,
    Back,
    Restart,
    NewSong,
    Difficulty(Difficulty),
    PrevSong,
    NextSong,
    ToggleDebug,
    VolumeUp,
    VolumeDown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyInput {
    Lane(Lane),
    Menu(MenuKey),
}

#[derive(Clone, Copy, Debug)]
pub struct InputEdge {
    pub input: KeyInput,
    pub pressed: bool,
    pub timestamp: Instant,
}

#[inline(always)]
pub fn lane_from_keycode(code: KeyCode) -> Option<Lane> {
    match code {
        KeyCode::KeyA => Some(Lane::A),
        KeyCode::KeyS => Some(Lane::S),
        KeyCode::KeyD => Some(Lane::D),
        KeyCode::KeyF => Some(Lane::F),
        KeyCode::KeyG => Some(Lane::G),
        _ => None,
    }
}

pub fn menu_key_from_keycode(code: KeyCode) -> Option<MenuKey> {
    match code {
        KeyCode::Space | KeyCode::Enter | KeyCode::NumpadEnter => Some(MenuKey::Confirm),
        KeyCode::Escape | KeyCode::KeyP => Some(MenuKey::Back),
        KeyCode::KeyR => Some(MenuKey::Restart),
        KeyCode::KeyN => Some(MenuKey::NewSong),
        KeyCode::Digit1 => Some(MenuKey::Difficulty(Difficulty::Easy)),
        KeyCode::Digit2 => Some(MenuKey::Difficulty(Difficulty::Medium)),
        KeyCode::Digit3 => Some(MenuKey::Difficulty(Difficulty::Hard)),
        KeyCode::ArrowUp => Some(MenuKey::PrevSong),
        KeyCode::ArrowDown => Some(MenuKey::NextSong),
        KeyCode::F1 => Some(MenuKey::ToggleDebug),
        KeyCode::Equal | KeyCode::NumpadAdd => Some(MenuKey::VolumeUp),
        KeyCode::Minus | KeyCode::NumpadSubtract => Some(MenuKey::VolumeDown),
        _ => None,
    }
}

#[inline(always)]
pub fn map_keycode(code: KeyCode) -> Option<KeyInput> {
    lane_from_keycode(code)
        .map(KeyInput::Lane)
        .or_else(|| menu_key_from_keycode(code).map(KeyInput::Menu))
}

/// Turns a window key event into an edge. Auto-repeat and unmapped keys yield `None`.
pub fn edge_from_key_event(event: &KeyEvent, timestamp: Instant) -> Option<InputEdge> {
    if event.repeat {
        return None;
    }
    let PhysicalKey::Code(code) = event.physical_key else {
        return None;
    };
    map_keycode(code).map(|input| InputEdge {
        input,
        pressed: event.state == ElementState::Pressed,
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lane_keys_cover_all_lanes_in_order() {
        let codes = [KeyCode::KeyA, KeyCode::KeyS, KeyCode::KeyD, KeyCode::KeyF, KeyCode::KeyG];
        let lanes: Vec<Lane> = codes.iter().filter_map(|c| lane_from_keycode(*c)).collect();
        assert_eq!(lanes, Lane::ALL.to_vec());
        assert_eq!(lane_from_keycode(KeyCode::KeyH), None);
    }

    #[test]
    fn lanes_take_priority_over_menu_keys() {
        assert_eq!(map_keycode(KeyCode::KeyS), Some(KeyInput::Lane(Lane::S)));
        assert_eq!(map_keycode(KeyCode::Escape), Some(KeyInput::Menu(MenuKey::Back)));
        assert_eq!(
            map_keycode(KeyCode::Digit3),
            Some(KeyInput::Menu(MenuKey::Difficulty(Difficulty::Hard)))
        );
        assert_eq!(map_keycode(KeyCode::KeyZ), None);
    }
}
