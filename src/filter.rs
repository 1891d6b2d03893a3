//! Record normalization, replication-cursor filtering and field projection.
//!
//! [`RecordFilter::normalize_and_filter`] turns a [`RawResult`] into a
//! [`FilteredRecordStream`]:
//! 1. every object is flattened through [`ToMapping`]
//! 2. records below the replication cursor are dropped
//! 3. surviving records are projected onto the field allowlist
//!
//! Input order is preserved. A malformed record aborts the batch unless the
//! filter runs in lenient mode, in which case it is logged and counted.

use crate::record::{NormalizedRecord, RawResult, ToMapping};
use crate::{ConnectorError, ConnectorResult, OperatorConfig, SingleObjectPolicy};
use serde_json::Value;
use tracing::{debug, info, warn, Level};

const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Read a JSON value as an integer the way the cursor comparison needs it
///
/// Accepts integer numbers, finite floats (truncated toward zero), booleans
/// (1/0) and strings holding a decimal integer with optional surrounding
/// whitespace. Anything else, including a missing value, is a
/// `ConnectorError::TypeCoercion` naming `field`.
pub fn coerce_integer(field: &str, value: Option<&Value>) -> ConnectorResult<i64> {
    let value = value.ok_or_else(|| ConnectorError::type_coercion(field, "field is missing"))?;

    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            let out_of_range =
                || ConnectorError::type_coercion(field, format!("{} does not fit in a 64-bit integer", n));
            if n.is_u64() {
                return Err(out_of_range());
            }
            // 2^63 is exact in f64; anything at or above it overflows i64.
            match n.as_f64().filter(|f| f.is_finite()).map(f64::trunc) {
                Some(t) if t >= -I64_BOUND && t < I64_BOUND => Ok(t as i64),
                _ => Err(out_of_range()),
            }
        }
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| {
            ConnectorError::type_coercion(field, format!("'{}' is not an integer", s))
        }),
        Value::Null => Err(ConnectorError::type_coercion(field, "expected integer, got null")),
        Value::Array(_) => Err(ConnectorError::type_coercion(field, "expected integer, got array")),
        Value::Object(_) => Err(ConnectorError::type_coercion(field, "expected integer, got object")),
    }
}

/// Minimum accepted value of a named field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationCursor {
    key: String,
    value: i64,
}

impl ReplicationCursor {
    /// Create a cursor from an integer value
    pub fn new(key: impl Into<String>, value: i64) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Create a cursor from a configured JSON value
    ///
    /// Fails with `TypeCoercion` on `replication_key_value` if the value is not an integer.
    pub fn parse(key: impl Into<String>, raw: &Value) -> ConnectorResult<Self> {
        let value = coerce_integer("replication_key_value", Some(raw))?;
        Ok(Self::new(key, value))
    }

    /// Get the field name
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the cursor value
    pub fn value(&self) -> i64 {
        self.value
    }

    /// Check whether a record is at or past the cursor
    pub fn admits(&self, record: &NormalizedRecord) -> ConnectorResult<bool> {
        let record_value = coerce_integer(&self.key, record.get(&self.key))?;
        Ok(record_value >= self.value)
    }
}

/// Ordered field allowlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldProjection {
    fields: Vec<String>,
}

impl FieldProjection {
    /// Create a projection; an empty list yields `None` (keep all fields)
    pub fn new<I, S>(fields: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if fields.is_empty() {
            None
        } else {
            Some(Self { fields })
        }
    }

    /// Get the field names in output order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Build a new record holding exactly the allowlisted fields, in allowlist order
    pub fn apply(&self, record: &NormalizedRecord) -> ConnectorResult<NormalizedRecord> {
        let mut projected = NormalizedRecord::new();
        for field in &self.fields {
            let value = record
                .get(field)
                .ok_or_else(|| ConnectorError::missing_field(field.clone()))?;
            projected.insert(field.clone(), value.clone());
        }
        Ok(projected)
    }
}

/// Records that passed the cursor and projection, in input order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredRecordStream {
    records: Vec<NormalizedRecord>,
    skipped: usize,
}

impl FilteredRecordStream {
    /// Create a stream from already filtered records
    pub fn new(records: Vec<NormalizedRecord>) -> Self {
        Self {
            records,
            skipped: 0,
        }
    }

    /// Get the records
    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    /// Iterate over the records
    pub fn iter(&self) -> std::slice::Iter<'_, NormalizedRecord> {
        self.records.iter()
    }

    /// Number of records in the stream
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the stream is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of malformed records skipped in lenient mode
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Take the records out of the stream
    pub fn into_records(self) -> Vec<NormalizedRecord> {
        self.records
    }
}

impl IntoIterator for FilteredRecordStream {
    type Item = NormalizedRecord;
    type IntoIter = std::vec::IntoIter<NormalizedRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a FilteredRecordStream {
    type Item = &'a NormalizedRecord;
    type IntoIter = std::slice::Iter<'a, NormalizedRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Normalizer and filter for one invocation
///
/// The default filter keeps every record and every field, aborts on the first
/// malformed record and filters single objects like collection elements.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    cursor: Option<ReplicationCursor>,
    projection: Option<FieldProjection>,
    lenient: bool,
    single_object: SingleObjectPolicy,
}

impl RecordFilter {
    /// Create a pass-through filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the filter described by an operator configuration
    ///
    /// Fails with `TypeCoercion` when a replication key is set and the cursor
    /// value is not an integer.
    pub fn from_config(config: &OperatorConfig) -> ConnectorResult<Self> {
        let cursor = match config.replication_key_name.as_deref() {
            Some(key) if !key.is_empty() => {
                Some(ReplicationCursor::parse(key, &config.replication_key_value)?)
            }
            _ => None,
        };

        let projection = config
            .allowed_fields()
            .and_then(|fields| FieldProjection::new(fields.iter().cloned()));

        Ok(Self {
            cursor,
            projection,
            lenient: config.processing.lenient,
            single_object: config.processing.single_object,
        })
    }

    /// Set the replication cursor
    pub fn with_cursor(mut self, cursor: ReplicationCursor) -> Self {
        self.cursor = Some(cursor);
        self
    }

    /// Set the field projection; an empty list keeps every field
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = FieldProjection::new(fields);
        self
    }

    /// Skip and log malformed records instead of failing
    pub fn lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    /// Choose how single-object results are handled
    pub fn single_object(mut self, policy: SingleObjectPolicy) -> Self {
        self.single_object = policy;
        self
    }

    /// Get the replication cursor
    pub fn cursor(&self) -> Option<&ReplicationCursor> {
        self.cursor.as_ref()
    }

    /// Get the field projection
    pub fn projection(&self) -> Option<&FieldProjection> {
        self.projection.as_ref()
    }

    /// Normalize a raw API result and apply cursor and projection
    ///
    /// # Errors
    ///
    /// - `TypeCoercion` when the cursor field is missing or not an integer
    /// - `MissingField` when a projected field is absent
    ///
    /// Both abort the whole batch unless the filter is lenient.
    /// `Serialization` from [`ToMapping`] always aborts.
    pub fn normalize_and_filter<T: ToMapping>(
        &self,
        raw: RawResult<T>,
    ) -> ConnectorResult<FilteredRecordStream> {
        let stream = match raw {
            RawResult::Single(object) => {
                let record = object.to_mapping()?;
                match self.single_object {
                    SingleObjectPolicy::Bypass => {
                        debug!("Single-object result, cursor and projection bypassed");
                        FilteredRecordStream::new(vec![record])
                    }
                    SingleObjectPolicy::Uniform => self.filter_records(std::iter::once(Ok(record)))?,
                }
            }
            RawResult::Collection(objects) => {
                self.filter_records(objects.iter().map(ToMapping::to_mapping))?
            }
        };

        info!(
            "Filtered records: {} kept, {} skipped",
            stream.len(),
            stream.skipped()
        );
        if tracing::enabled!(Level::DEBUG) {
            for record in stream.iter() {
                debug!("{}", serde_json::to_string(record).unwrap_or_default());
            }
        }

        Ok(stream)
    }

    fn filter_records(
        &self,
        records: impl Iterator<Item = ConnectorResult<NormalizedRecord>>,
    ) -> ConnectorResult<FilteredRecordStream> {
        let mut stream = FilteredRecordStream::default();

        for (index, record) in records.enumerate() {
            match record.and_then(|record| self.apply(record)) {
                Ok(Some(record)) => stream.records.push(record),
                Ok(None) => {}
                Err(e) if self.lenient && e.is_record_error() => {
                    warn!("Skipping record #{}: {}", index, e);
                    stream.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(stream)
    }

    fn apply(&self, record: NormalizedRecord) -> ConnectorResult<Option<NormalizedRecord>> {
        if let Some(cursor) = &self.cursor {
            if !cursor.admits(&record)? {
                return Ok(None);
            }
        }

        match &self.projection {
            Some(projection) => projection.apply(&record).map(Some),
            None => Ok(Some(record)),
        }
    }
}
