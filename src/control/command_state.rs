//! Last-known remote command values.
//!
//! Every field is updated on its own as notifications arrive; there is no
//! atomic multi-field snapshot.  A field is only overwritten when the
//! notification's declared type matches the field's kind, so schema drift
//! on the app side can never corrupt the local state.

use log::debug;

use crate::paths;
use crate::stream::{DeclaredType, StreamValue};

/// Expected value kind of a command field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Boolean,
    Numeric,
}

impl FieldKind {
    /// Whether a notification declared as `declared` may write this kind.
    pub fn accepts(self, declared: DeclaredType) -> bool {
        match self {
            Self::Boolean => declared == DeclaredType::Boolean,
            Self::Numeric => declared.is_numeric(),
        }
    }
}

/// The remotely writable command fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandField {
    ValveCommand,
    FanManualCommand,
    FanAutoMode,
    TempThreshold,
}

impl CommandField {
    pub const ALL: [Self; 4] = [
        Self::ValveCommand,
        Self::FanManualCommand,
        Self::FanAutoMode,
        Self::TempThreshold,
    ];

    /// Resolve a full store path (`/controls/valveCommand`).
    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.path() == path)
    }

    pub fn path(self) -> &'static str {
        match self {
            Self::ValveCommand => paths::VALVE_COMMAND,
            Self::FanManualCommand => paths::FAN_MANUAL_COMMAND,
            Self::FanAutoMode => paths::FAN_AUTO_MODE,
            Self::TempThreshold => paths::TEMP_THRESHOLD,
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Self::TempThreshold => FieldKind::Numeric,
            _ => FieldKind::Boolean,
        }
    }
}

/// Result of a single [`CommandState::apply_field_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The field was written (possibly with its current value).
    Applied(CommandField),
    /// Declared type (or payload) did not match the field; nothing changed.
    TypeMismatch {
        field: CommandField,
        declared: DeclaredType,
    },
    /// The path names no command field; nothing changed.
    UnknownPath,
}

/// Latest command values received from the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandState {
    pub valve_command: bool,
    pub fan_manual_command: bool,
    pub fan_auto_mode: bool,
    /// °C.  Accepted as sent: no range check.
    pub temp_threshold: f32,
}

impl Default for CommandState {
    /// Safe defaults: valve closed, fan manual off, fan in auto at 28 °C.
    fn default() -> Self {
        Self::with_threshold(28.0)
    }
}

impl CommandState {
    /// Safe defaults with a configured auto-mode threshold.
    pub fn with_threshold(temp_threshold: f32) -> Self {
        Self {
            valve_command: false,
            fan_manual_command: false,
            fan_auto_mode: true,
            temp_threshold,
        }
    }

    /// Set the field named by `path` if `declared` matches its kind.
    ///
    /// This is the only mutator.  Type-mismatched or unknown updates leave
    /// every field untouched.
    pub fn apply_field_update(
        &mut self,
        path: &str,
        declared: DeclaredType,
        value: &StreamValue,
    ) -> UpdateOutcome {
        let Some(field) = CommandField::from_path(path) else {
            debug!("CommandState: ignoring update for unknown path {}", path);
            return UpdateOutcome::UnknownPath;
        };
        let mismatch = UpdateOutcome::TypeMismatch { field, declared };
        if !field.kind().accepts(declared) {
            return mismatch;
        }

        match (field, value) {
            (CommandField::ValveCommand, StreamValue::Boolean(b)) => self.valve_command = *b,
            (CommandField::FanManualCommand, StreamValue::Boolean(b)) => {
                self.fan_manual_command = *b;
            }
            (CommandField::FanAutoMode, StreamValue::Boolean(b)) => self.fan_auto_mode = *b,
            (CommandField::TempThreshold, StreamValue::Number(n)) => {
                self.temp_threshold = *n as f32;
            }
            // Declared type agreed but the payload did not.
            _ => return mismatch,
        }
        UpdateOutcome::Applied(field)
    }
}
