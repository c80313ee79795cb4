//! # Channel Registry
//!
//! Maps logical pin names (`pwm5`, `pwm7`, ...) to the physical PWM channel
//! that drives them.
//!
//! The table is an ordinary value built once at startup and handed to whoever
//! needs it. Lookups are pure: no I/O, no interior mutability.

use std::fmt;

use crate::error::{PwmError, PwmResult};

/// Physical location of one PWM output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding
{
    /// Controller index (`pwmchipN`)
    pub chip: u32,
    /// Channel index within the controller (`pwmN`)
    pub channel: u32,
    /// Connector pin number, for diagnostics
    pub header_pin: u32,
    /// SoC signal name, for diagnostics
    pub signal: String,
}

impl Binding
{
    /// Create a new binding
    pub fn new(chip: u32, channel: u32, header_pin: u32, signal: impl Into<String>) -> Self
    {
        Self {
            chip,
            channel,
            header_pin,
            signal: signal.into(),
        }
    }
}

impl fmt::Display for Binding
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(
            f,
            "HDR40 pin {} / {} at pwmchip{} channel {}",
            self.header_pin, self.signal, self.chip, self.channel
        )
    }
}

/// A pin name paired with its binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPin
{
    /// Logical name as requested
    pub name: String,
    /// Where the pin lives
    pub binding: Binding,
}

/// Immutable, ordered pin table
#[derive(Debug, Clone, Default)]
pub struct Registry
{
    pins: Vec<(String, Binding)>,
}

impl Registry
{
    /// Build a registry from `(name, binding)` pairs
    ///
    /// Iteration order follows the input order. Later duplicates of a name
    /// are ignored.
    pub fn new<I, S>(pins: I) -> Self
    where
        I: IntoIterator<Item = (S, Binding)>,
        S: Into<String>,
    {
        let mut table: Vec<(String, Binding)> = Vec::new();
        for (name, binding) in pins {
            let name = name.into();
            if table.iter().all(|(existing, _)| *existing != name) {
                table.push((name, binding));
            }
        }
        Self { pins: table }
    }

    /// The PWM pins broken out on the Jetson Orin 40-pin header
    #[must_use]
    pub fn jetson_hdr40() -> Self
    {
        Self::new([
            ("pwm5", Binding::new(2, 0, 33, "soc_gpio21_ph0")),
            ("pwm7", Binding::new(3, 0, 32, "soc_gpio19_pg6")),
        ])
    }

    /// Look up one pin
    ///
    /// ## Errors
    ///
    /// - `UnknownPin`: `name` is not in the table
    pub fn resolve(&self, name: &str) -> PwmResult<&Binding>
    {
        self.pins
            .iter()
            .find(|(pin, _)| pin == name)
            .map(|(_, binding)| binding)
            .ok_or_else(|| PwmError::UnknownPin {
                name: name.to_string(),
                valid: self.names().collect::<Vec<_>>().join(", "),
            })
    }

    /// Resolve every requested name, or none of them
    ///
    /// ## Errors
    ///
    /// - `UnknownPin`: the first name that is not in the table
    pub fn resolve_all<S: AsRef<str>>(&self, names: &[S]) -> PwmResult<Vec<ResolvedPin>>
    {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.resolve(name).map(|binding| ResolvedPin {
                    name: name.to_string(),
                    binding: binding.clone(),
                })
            })
            .collect()
    }

    /// Known pin names in table order
    pub fn names(&self) -> impl Iterator<Item = &str>
    {
        self.pins.iter().map(|(name, _)| name.as_str())
    }

    /// Known pins in table order
    pub fn pins(&self) -> impl Iterator<Item = (&str, &Binding)>
    {
        self.pins.iter().map(|(name, binding)| (name.as_str(), binding))
    }

    /// Number of known pins
    #[must_use]
    pub fn len(&self) -> usize
    {
        self.pins.len()
    }

    /// Whether the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.pins.is_empty()
    }
}
