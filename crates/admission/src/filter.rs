use contracts::{BridgeError, ChannelName};

/// Inclusive numeric range test over one named field of a record.
///
/// The field position is bound lazily once the record schema is known;
/// after binding it never changes.
#[derive(Debug, Clone)]
pub struct RangeFilter {
    channel: ChannelName,
    index: Option<usize>,
    min_value: f64,
    max_value: f64,
}

impl RangeFilter {
    /// Build a filter for `channel` admitting values in `[min_value, max_value]`.
    ///
    /// Reversed bounds are swapped, not rejected. A blank channel name or a
    /// NaN bound fails construction.
    pub fn new(
        channel: impl Into<String>,
        min_value: f64,
        max_value: f64,
    ) -> Result<Self, BridgeError> {
        let channel = channel.into();
        if channel.trim().is_empty() {
            return Err(BridgeError::invalid_filter(
                channel,
                "channel name cannot be blank",
            ));
        }
        if min_value.is_nan() || max_value.is_nan() {
            return Err(BridgeError::invalid_filter(
                channel,
                "threshold is not a number",
            ));
        }
        let (min_value, max_value) = if min_value <= max_value {
            (min_value, max_value)
        } else {
            (max_value, min_value)
        };
        Ok(Self {
            channel: ChannelName::from(channel.as_str()),
            index: None,
            min_value,
            max_value,
        })
    }

    /// Bind the filter to a field position. The first binding wins; later
    /// calls are no-ops.
    pub fn bind_index(&mut self, index: usize) {
        if self.index.is_none() {
            self.index = Some(index);
        }
    }

    pub fn channel(&self) -> &ChannelName {
        &self.channel
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn min_value(&self) -> f64 {
        self.min_value
    }

    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    /// Test the bound field of one record.
    ///
    /// `MalformedRecord` covers an empty record or a bound position missing
    /// from it. A field that does not parse as a real number is `NotNumeric`,
    /// which is distinct from a clean `false`.
    pub fn check_fields<S: AsRef<str>>(&self, fields: &[S]) -> Result<bool, BridgeError> {
        if fields.is_empty() {
            return Err(BridgeError::malformed_record("record has no fields"));
        }
        let index = self.index.ok_or_else(|| {
            BridgeError::malformed_record(format!(
                "filter for '{}' is not bound to a field",
                self.channel
            ))
        })?;
        let field = fields.get(index).ok_or_else(|| {
            BridgeError::malformed_record(format!(
                "field {} out of range for record with {} fields",
                index,
                fields.len()
            ))
        })?;
        let field = field.as_ref().trim();
        let value: f64 = field
            .parse()
            .map_err(|_| BridgeError::not_numeric(self.channel.as_str(), field))?;
        Ok(value >= self.min_value && value <= self.max_value)
    }
}
