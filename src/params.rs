use crate::types::{Direction, RowValues};

static NULL_VALUE: RowValues = RowValues::Null;

/// A single bound parameter of a command.
///
/// Built through [`CommandExecutor::make_parameter`](crate::CommandExecutor::make_parameter)
/// so callers never construct driver-native parameter objects. An empty name
/// means the parameter binds by position.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    direction: Direction,
    value: RowValues,
    size: Option<usize>,
}

impl Parameter {
    /// Build a parameter; a leading `@`, `:` or `$` on the name is dropped.
    #[must_use]
    pub fn new(name: &str, direction: Direction, value: RowValues) -> Self {
        Self {
            name: normalize_name(name).to_string(),
            direction,
            value,
            size: None,
        }
    }

    /// An input parameter bound by position.
    #[must_use]
    pub fn positional(value: impl Into<RowValues>) -> Self {
        Self::new("", Direction::Input, value.into())
    }

    /// Attach a size hint. Drivers in this crate size values themselves, so the
    /// hint is informational.
    #[must_use]
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_named(&self) -> bool {
        !self.name.is_empty()
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub fn value(&self) -> &RowValues {
        &self.value
    }

    #[must_use]
    pub fn size(&self) -> Option<usize> {
        self.size
    }

    /// The value actually sent to the driver. Output-only parameters send NULL
    /// so positions stay stable.
    #[must_use]
    pub fn bound_value(&self) -> &RowValues {
        if self.direction.carries_value() {
            &self.value
        } else {
            &NULL_VALUE
        }
    }
}

pub(crate) fn normalize_name(name: &str) -> &str {
    let trimmed = name.trim();
    trimmed.strip_prefix(['@', ':', '$']).unwrap_or(trimmed)
}

/// Values to bind, in declaration order.
pub(crate) fn bound_values(params: &[Parameter]) -> Vec<RowValues> {
    params.iter().map(|p| p.bound_value().clone()).collect()
}
