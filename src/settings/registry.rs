//! Settings registry
//! Registry that holds setting descriptors and applies values to a target

use super::descriptor::{SettingDescriptor, SettingError, SettingType, SettingValue};

/// Settings registry
///
/// Holds static setting descriptors and provides:
/// - Option name resolution (names and aliases)
/// - Value parsing and validation
/// - Setting execution through the descriptor's setter
pub struct SettingsRegistry<T: 'static> {
    /// Static array of setting descriptors
    settings: &'static [SettingDescriptor<T>],
}

impl<T: 'static> Clone for SettingsRegistry<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> Copy for SettingsRegistry<T> {}

impl<T: 'static> SettingsRegistry<T> {
    /// Create a new registry from static descriptors
    #[must_use]
    pub const fn new(descriptors: &'static [SettingDescriptor<T>]) -> Self {
        SettingsRegistry {
            settings: descriptors,
        }
    }

    /// Resolve an option name or alias (case-insensitive)
    pub fn resolve(&self, name: &str) -> Result<&'static SettingDescriptor<T>, SettingError> {
        let input = name.trim();
        self.settings
            .iter()
            .find(|d| {
                d.name.eq_ignore_ascii_case(input)
                    || d.aliases.iter().any(|a| a.eq_ignore_ascii_case(input))
            })
            .ok_or_else(|| SettingError::UnknownOption(name.to_string()))
    }

    /// Parse string value to `SettingValue` using `SettingType`
    ///
    /// Handles parsing and validation according to the setting type.
    /// Returns typed `SettingValue` or structured error.
    pub fn parse_value(ty: &SettingType, value: &str) -> Result<SettingValue, SettingError> {
        match ty {
            SettingType::Boolean => {
                let val_lower = value.to_lowercase();
                match val_lower.as_str() {
                    "true" | "1" | "on" | "yes" => Ok(SettingValue::Bool(true)),
                    "false" | "0" | "off" | "no" => Ok(SettingValue::Bool(false)),
                    _ => Err(SettingError::ParseError(format!(
                        "Invalid boolean value: {value}"
                    ))),
                }
            }
            SettingType::Integer { min, max } => {
                let val = value.trim().parse::<usize>().map_err(|_| {
                    SettingError::ParseError(format!("Invalid integer value: {value}"))
                })?;

                if let Some(min_val) = min {
                    if val < *min_val {
                        return Err(SettingError::ValidationError(format!(
                            "Value {val} is below minimum {min_val}"
                        )));
                    }
                }
                if let Some(max_val) = max {
                    if val > *max_val {
                        return Err(SettingError::ValidationError(format!(
                            "Value {val} is above maximum {max_val}"
                        )));
                    }
                }
                Ok(SettingValue::Integer(val))
            }
            SettingType::Enum { variants } => {
                // Find canonical variant (case-insensitive match)
                variants
                    .iter()
                    .copied()
                    .find(|v| v.eq_ignore_ascii_case(value.trim()))
                    .map(SettingValue::Enum)
                    .ok_or_else(|| {
                        SettingError::ParseError(format!(
                            "Invalid enum value: {value}. Valid values: {variants:?}"
                        ))
                    })
            }
        }
    }

    /// Set an option by name with a string value
    ///
    /// Flow:
    /// 1. Resolve option name or alias
    /// 2. Parse string value to `SettingValue` using `SettingType`
    /// 3. Call setter function with typed value
    pub fn apply(&self, target: &mut T, name: &str, value: &str) -> Result<(), SettingError> {
        let desc = self.resolve(name)?;
        let typed_value = Self::parse_value(&desc.ty, value)?;
        (desc.set)(target, typed_value)
    }

    /// Apply a `name=value` assignment; a bare boolean name sets it to true
    pub fn apply_assignment(&self, target: &mut T, assignment: &str) -> Result<(), SettingError> {
        if let Some((name, value)) = assignment.split_once('=') {
            return self.apply(target, name, value);
        }

        let desc = self.resolve(assignment)?;
        match desc.ty {
            SettingType::Boolean => (desc.set)(target, SettingValue::Bool(true)),
            _ => Err(SettingError::ParseError(format!("Missing value for {}", desc.name))),
        }
    }
}
