use crate::{
    settings::{HotkeyBinding, HotkeyMode},
    types::KeyTransition,
};

/// Synthetic key change requested by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutput {
    Press(String),
    Release(String),
}

/// Maps one physical key onto a synthetic key that is held or released.
///
/// In hold mode the synthetic key mirrors the physical one. In toggle mode
/// every physical press flips the synthetic key and releases are ignored.
/// The controller remembers which key it pressed so a later release (or a
/// forced release after a rebind) targets the same key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HotkeyButtonController {
    held: Option<String>,
}

impl HotkeyButtonController {
    pub fn is_held(&self) -> bool {
        self.held.is_some()
    }

    pub fn held_key(&self) -> Option<&str> {
        self.held.as_deref()
    }

    pub fn on_transition(
        &self,
        binding: &HotkeyBinding,
        transition: KeyTransition,
    ) -> (Self, Option<KeyOutput>) {
        match (binding.mode, transition, &self.held) {
            (HotkeyMode::Hold, KeyTransition::Down, None)
            | (HotkeyMode::Toggle, KeyTransition::Down, None) => (
                Self {
                    held: Some(binding.output.clone()),
                },
                Some(KeyOutput::Press(binding.output.clone())),
            ),
            (HotkeyMode::Hold, KeyTransition::Up, Some(key))
            | (HotkeyMode::Toggle, KeyTransition::Down, Some(key)) => {
                (Self::default(), Some(KeyOutput::Release(key.clone())))
            }
            // hold: repeated down or stray up; toggle: any up
            _ => (self.clone(), None),
        }
    }

    /// Releases a held key when the binding changed underneath it.
    pub fn on_rebind(
        &self,
        previous: &HotkeyBinding,
        next: &HotkeyBinding,
    ) -> (Self, Option<KeyOutput>) {
        match &self.held {
            Some(key) if previous != next => {
                (Self::default(), Some(KeyOutput::Release(key.clone())))
            }
            _ => (self.clone(), None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(mode: HotkeyMode) -> HotkeyBinding {
        HotkeyBinding {
            trigger: "F6".into(),
            output: "W".into(),
            mode,
        }
    }

    fn drive(
        mode: HotkeyMode,
        transitions: &[KeyTransition],
    ) -> (HotkeyButtonController, Vec<KeyOutput>) {
        let binding = binding(mode);
        let mut controller = HotkeyButtonController::default();
        let mut outputs = Vec::new();
        for transition in transitions {
            let (next, output) = controller.on_transition(&binding, *transition);
            controller = next;
            outputs.extend(output);
        }
        (controller, outputs)
    }

    #[test]
    fn hold_mode_mirrors_physical_key() {
        let (controller, outputs) =
            drive(HotkeyMode::Hold, &[KeyTransition::Down, KeyTransition::Up]);
        assert!(!controller.is_held());
        assert_eq!(
            outputs,
            vec![KeyOutput::Press("W".into()), KeyOutput::Release("W".into())]
        );
    }

    #[test]
    fn hold_mode_down_without_up_stays_held() {
        let (controller, outputs) =
            drive(HotkeyMode::Hold, &[KeyTransition::Down, KeyTransition::Down]);
        assert_eq!(controller.held_key(), Some("W"));
        assert_eq!(outputs, vec![KeyOutput::Press("W".into())]);
    }

    #[test]
    fn hold_mode_ignores_stray_release() {
        let (controller, outputs) = drive(HotkeyMode::Hold, &[KeyTransition::Up]);
        assert!(!controller.is_held());
        assert!(outputs.is_empty());
    }

    #[test]
    fn toggle_mode_flips_on_each_press() {
        let (controller, outputs) =
            drive(HotkeyMode::Toggle, &[KeyTransition::Down, KeyTransition::Down]);
        assert!(!controller.is_held());
        assert_eq!(
            outputs,
            vec![KeyOutput::Press("W".into()), KeyOutput::Release("W".into())]
        );
    }

    #[test]
    fn toggle_mode_ignores_releases() {
        let (controller, outputs) = drive(
            HotkeyMode::Toggle,
            &[
                KeyTransition::Down,
                KeyTransition::Up,
                KeyTransition::Up,
                KeyTransition::Down,
                KeyTransition::Up,
            ],
        );
        assert!(!controller.is_held());
        assert_eq!(
            outputs,
            vec![KeyOutput::Press("W".into()), KeyOutput::Release("W".into())]
        );

        let (controller, _) = drive(HotkeyMode::Toggle, &[KeyTransition::Down, KeyTransition::Up]);
        assert!(controller.is_held());
    }

    #[test]
    fn rebind_while_held_forces_release_of_pressed_key() {
        let (held, _) = drive(HotkeyMode::Toggle, &[KeyTransition::Down]);

        let mut next = binding(HotkeyMode::Hold);
        next.output = "Space".into();
        let (controller, output) = held.on_rebind(&binding(HotkeyMode::Toggle), &next);

        assert!(!controller.is_held());
        assert_eq!(output, Some(KeyOutput::Release("W".into())));
    }

    #[test]
    fn rebind_is_quiet_when_nothing_changes_or_nothing_is_held() {
        let (held, _) = drive(HotkeyMode::Hold, &[KeyTransition::Down]);
        let same = binding(HotkeyMode::Hold);
        let (controller, output) = held.on_rebind(&same, &same);
        assert!(controller.is_held());
        assert_eq!(output, None);

        let idle = HotkeyButtonController::default();
        let (_, output) = idle.on_rebind(&same, &binding(HotkeyMode::Toggle));
        assert_eq!(output, None);
    }
}
