//! Property tests for button edge detection.

use proptest::prelude::*;
use sable_engine::input::{Input, Key, KeyboardState};

fn keyboard(keys: &[usize]) -> KeyboardState {
    keys.iter()
        .fold(KeyboardState::new(), |state, &i| state.with(Key::ALL[i % Key::ALL.len()]))
}

fn key_indices() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0..Key::ALL.len(), 0..6)
}

proptest! {
    /// Edges are consistent with held state for any pair of snapshots.
    #[test]
    fn edges_agree_with_held_state(
        before in key_indices(),
        after in key_indices(),
        mapped in prop::collection::vec(0..Key::ALL.len(), 1..4),
    ) {
        let mut input = Input::new();
        let keys: Vec<Key> = mapped.iter().map(|&i| Key::ALL[i]).collect();
        input.register_keys("action", &keys);

        input.refresh(keyboard(&before));
        input.update();
        input.refresh(keyboard(&after));

        let down = input.button_down("action").unwrap();
        let pressed = input.button_pressed("action").unwrap();
        let released = input.button_released("action").unwrap();

        if pressed {
            prop_assert!(down, "pressed implies down");
        }
        let expect_down = keys.iter().any(|k| keyboard(&after).is_down(*k));
        prop_assert_eq!(down, expect_down);

        if keys.len() == 1 {
            prop_assert!(!(pressed && released), "a single key cannot do both");
        }
    }

    /// With an unchanged keyboard, no edges survive an update.
    #[test]
    fn steady_state_has_no_edges(held in key_indices(), mapped in 0..Key::ALL.len()) {
        let mut input = Input::new();
        input.register_keys("action", &[Key::ALL[mapped]]);
        let state = keyboard(&held);

        input.refresh(state);
        input.update();
        input.refresh(state);

        prop_assert!(!input.button_pressed("action").unwrap());
        prop_assert!(!input.button_released("action").unwrap());
        prop_assert_eq!(input.button_down("action").unwrap(), state.is_down(Key::ALL[mapped]));
    }
}
