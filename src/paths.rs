//! Remote-store path layout for the greenhouse node.
//!
//! Single source of truth for the wire contract: the command state,
//! telemetry publisher, and stream decoder all reference this module
//! rather than hard-coding paths.  The app side reads and writes the
//! same layout, so a change here is a protocol change.

// ---------------------------------------------------------------------------
// Remote → device (streamed, one notification per field)
// ---------------------------------------------------------------------------

/// Subscription root for every command field.
pub const CONTROLS: &str = "/controls";

/// Boolean: open the irrigation valve.
pub const VALVE_COMMAND: &str = "/controls/valveCommand";
/// Boolean: fan on/off while in manual mode.
pub const FAN_MANUAL_COMMAND: &str = "/controls/fanManualCommand";
/// Boolean: `true` = fan follows temperature, `false` = fan follows the manual command.
pub const FAN_AUTO_MODE: &str = "/controls/fanAutoMode";
/// Number (°C): auto-mode fan threshold.
pub const TEMP_THRESHOLD: &str = "/controls/tempThreshold";

// ---------------------------------------------------------------------------
// Device → remote (full record replaced every tick)
// ---------------------------------------------------------------------------

/// `{temperature, humidity, soilMoisture1}`
pub const READINGS: &str = "/readings";
/// `{valveState, fanState}`
pub const STATE: &str = "/state";

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Longest path (bytes) carried inside a queued notification.
pub const MAX_PATH_LEN: usize = 64;

/// Join a stream root and a stream-relative path into a full store path.
///
/// `("/controls", "/valveCommand")` → `"/controls/valveCommand"`;
/// a relative path of `"/"` yields the root itself.
pub fn join(root: &str, relative: &str) -> String {
    let root = root.trim_end_matches('/');
    let relative = relative.trim_start_matches('/');
    if relative.is_empty() {
        if root.is_empty() { "/".to_string() } else { root.to_string() }
    } else {
        format!("{}/{}", root, relative)
    }
}
