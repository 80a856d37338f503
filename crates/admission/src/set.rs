use tracing::warn;

use contracts::BridgeError;

use crate::RangeFilter;

/// All configured admission filters, evaluated as a conjunction.
///
/// An empty set admits everything.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    filters: Vec<RangeFilter>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: RangeFilter) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn filters(&self) -> &[RangeFilter] {
        &self.filters
    }

    /// Bind every filter to its field position in `field_names`.
    ///
    /// Filters whose channel never appears in the schema can never be
    /// evaluated and are dropped here with a warning.
    pub fn bind_fields<S: AsRef<str>>(&mut self, field_names: &[S]) {
        for filter in &mut self.filters {
            let position = field_names
                .iter()
                .position(|name| name.as_ref() == filter.channel().as_str());
            if let Some(position) = position {
                filter.bind_index(position);
            }
        }
        self.filters.retain(|filter| {
            if filter.index().is_none() {
                warn!(
                    channel = %filter.channel(),
                    "dropping filter with no matching field in the schema"
                );
                return false;
            }
            true
        });
    }

    /// Admit a record iff every filter passes.
    ///
    /// The first failing filter short-circuits; `MalformedRecord` and
    /// `NotNumeric` propagate to the caller, which drops the record.
    pub fn admit<S: AsRef<str>>(&self, fields: &[S]) -> Result<bool, BridgeError> {
        for filter in &self.filters {
            if !filter.check_fields(fields)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
