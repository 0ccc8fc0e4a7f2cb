/// Transaction code used when no known range matches the SDK level.
const FALLBACK_CODE: u32 = 8;

/// Parameters for toggling the global sensor-privacy switch via
/// `service call sensor_privacy`. The transaction code moved between Android
/// releases, so it has to be resolved from the SDK level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorToggleSpec {
    pub transaction_code: u32,
    pub enable_value: u32,
    pub disable_value: u32,
    /// Set when the SDK level matched no known range and the fallback code
    /// was used. Callers warn; they do not abort.
    pub uncertain: bool,
}

/// Map an Android SDK level to its sensor-privacy toggle parameters.
/// Total: unknown levels degrade to a best-guess fallback rather than failing,
/// so an unsupported device still gets the rest of the hardening.
pub fn resolve(sdk: u32) -> SensorToggleSpec {
    let (transaction_code, uncertain) = match sdk {
        29 | 30 => (4, false),
        31 | 32 => (8, false),
        s if s >= 33 => (9, false),
        _ => (FALLBACK_CODE, true),
    };
    SensorToggleSpec {
        transaction_code,
        enable_value: 1,
        disable_value: 0,
        uncertain,
    }
}
